use serde_json::json;

use crate::access::Plan;
use crate::cli::OutputFormat;

pub fn handle(output_format: OutputFormat) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let plans: Vec<_> = Plan::ALL
                .iter()
                .map(|p| json!({ "plan": p.as_str(), "seat_limit": p.seat_limit() }))
                .collect();
            println!("{}", serde_json::to_string_pretty(&json!({ "plans": plans }))?);
        }
        OutputFormat::Text => {
            println!("{:<12} {}", "PLAN", "SEATS");
            for plan in Plan::ALL {
                println!("{:<12} {}", plan.as_str(), plan.seat_limit());
            }
        }
    }
    Ok(())
}
