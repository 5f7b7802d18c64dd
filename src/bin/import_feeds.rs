//! Load feed compositions into the feed library
//!
//! Usage: import_feeds <feeds.json>
//!
//! The file holds a JSON array of records keyed by feed library column names
//! (`Fd_Name`, `Fd_CP`, ...). Existing feeds with the same name are replaced.

use dairy_ration::db::{self, migrations, Database};
use dairy_ration::models::FeedComposition;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let Some(json_path) = std::env::args().nth(1) else {
        eprintln!("Usage: import_feeds <feeds.json>");
        std::process::exit(2);
    };

    let feeds: Vec<FeedComposition> = serde_json::from_str(&std::fs::read_to_string(&json_path)?)?;
    println!("Read {} feeds from {}", feeds.len(), json_path);

    let db_path = db::database_path();
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    println!("Feed library: {}", db_path.display());

    let database = Database::new(&db_path)?;

    let total = database.with_conn_mut(|conn| {
        migrations::run_migrations(conn)?;

        let tx = conn.transaction()?;
        for feed in &feeds {
            FeedComposition::create(&tx, feed)?;
        }
        tx.commit()?;

        FeedComposition::count(conn)
    })?;

    println!("Imported {} feeds ({} in library)", feeds.len(), total);
    Ok(())
}
