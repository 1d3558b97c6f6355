use breathwork_core::Database;
use chrono::Utc;

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let stats = db.stats(Utc::now().date_naive())?;
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}
