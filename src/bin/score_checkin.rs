use std::io::Read;

use anyhow::Context;
use clinic_portal::risk::{HealthDeclaration, assess};

/// Usage: score_checkin [declaration.json]   (reads stdin when no file is given)
fn main() -> anyhow::Result<()> {
    let raw = match std::env::args().nth(1) {
        Some(path) => {
            std::fs::read_to_string(&path).with_context(|| format!("reading {path}"))?
        }
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading declaration from stdin")?;
            buf
        }
    };

    let value: serde_json::Value =
        serde_json::from_str(&raw).context("declaration must be valid JSON")?;
    let assessment = assess(&HealthDeclaration::from_value(&value));
    println!("{}", serde_json::to_string(&assessment)?);
    Ok(())
}
