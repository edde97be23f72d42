//! Printing command results, as text or as JSON.

use anyhow::Result;
use banward::{
    BanEntry, BanReceipt, CycleOutcome, CycleReport, DispatchOutcome, DispatchResult,
    PlayerSummary, RconResponse,
};
use serde_json::{json, Value};

pub fn print_cycle_report(report: &CycleReport, as_json: bool) -> Result<()> {
    if as_json {
        return print_json(&cycle_report_json(report));
    }

    match &report.outcome {
        CycleOutcome::NothingExpired => println!("No expired bans."),
        CycleOutcome::Committed(version) => {
            println!(
                "Unbanned {} (ledger version {version})",
                report.unbanned.join(", ")
            );
        }
        CycleOutcome::ConflictDeferred => {
            println!("Ledger kept changing underneath us; deferred to the next cycle.");
        }
        CycleOutcome::Aborted { stage, reason, .. } => println!("Failed while {stage}: {reason}"),
    }

    for (subject, servers) in report.stale_servers() {
        println!("  {subject} may still be banned on: {}", servers.join(", "));
    }
    for subject in report.rebanned.keys() {
        println!("  {subject} was banned again meanwhile; ban restored");
    }
    Ok(())
}

pub fn print_receipt(receipt: &BanReceipt, as_json: bool) -> Result<()> {
    if as_json {
        return print_json(&json!({
            "subject": receipt.request.subject,
            "banneduntil": receipt.request.expiry.to_string(),
            "reason": receipt.request.reason,
            "replaced": receipt.replaced,
            "version": receipt.token.to_string(),
            "conflicts": receipt.conflicts,
            "dispatches": receipt.dispatches.iter().map(dispatch_json).collect::<Vec<_>>(),
        }));
    }

    println!("{receipt}");
    Ok(())
}

pub fn print_status(subject: &str, entry: Option<&BanEntry>, as_json: bool) -> Result<()> {
    if as_json {
        return print_json(&json!({ "subject": subject, "entry": entry }));
    }

    match entry {
        Some(entry) => println!(
            "{subject} is banned until {} for: {}",
            entry.expiry, entry.reason
        ),
        None => println!("{subject} is not banned."),
    }
    Ok(())
}

pub fn print_lines(lines: &[String], as_json: bool) -> Result<()> {
    if as_json {
        return print_json(&json!(lines));
    }

    for line in lines {
        println!("{line}");
    }
    Ok(())
}

pub fn print_response(response: &RconResponse, as_json: bool) -> Result<()> {
    if as_json {
        return print_json(&response_json(response));
    }

    println!("{response}");
    Ok(())
}

pub fn print_players(players: &[PlayerSummary], as_json: bool) -> Result<()> {
    if as_json {
        return print_json(&serde_json::to_value(players)?);
    }

    if players.is_empty() {
        println!("No players connected.");
    }
    for player in players {
        println!(
            "{:<24} {:>4} kills {:>4} deaths",
            player.username, player.kills, player.deaths
        );
    }
    Ok(())
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn cycle_report_json(report: &CycleReport) -> Value {
    let outcome = match &report.outcome {
        CycleOutcome::NothingExpired => json!({ "status": "nothing_expired" }),
        CycleOutcome::Committed(version) => {
            json!({ "status": "committed", "version": version.to_string() })
        }
        CycleOutcome::ConflictDeferred => json!({ "status": "conflict_deferred" }),
        CycleOutcome::Aborted {
            stage,
            kind,
            reason,
        } => json!({
            "status": "aborted",
            "stage": stage.as_str(),
            "kind": kind.as_str(),
            "reason": reason,
        }),
    };

    let dispatches = |map: &std::collections::BTreeMap<String, Vec<DispatchResult>>| -> Value {
        map.iter()
            .map(|(subject, results)| {
                (
                    subject.clone(),
                    Value::Array(results.iter().map(dispatch_json).collect()),
                )
            })
            .collect::<serde_json::Map<_, _>>()
            .into()
    };

    json!({
        "outcome": outcome,
        "unbanned": report.unbanned,
        "conflicts": report.conflicts,
        "dispatches": dispatches(&report.dispatches),
        "rebanned": dispatches(&report.rebanned),
    })
}

fn dispatch_json(result: &DispatchResult) -> Value {
    match &result.outcome {
        DispatchOutcome::Delivered(response) => json!({
            "server": result.server,
            "success": true,
            "response": response_json(response),
        }),
        DispatchOutcome::Failed { kind, reason } => json!({
            "server": result.server,
            "success": false,
            "kind": kind.as_str(),
            "reason": reason,
        }),
    }
}

fn response_json(response: &RconResponse) -> Value {
    match response {
        RconResponse::Text(text) => Value::String(text.clone()),
        RconResponse::Structured(value) => value.clone(),
    }
}
