//! Dump a save file as JSON for debugging
//!
//! Takes the path to a save as its only argument. Prints the header, the
//! decoded property tree, any diagnostics, and the keys each section lists.
//! Sections are scanned as a Six Inches Under save so the actor state map is
//! included when present. Set `RUST_LOG=debug` to see decoder logging.
//!
//! ```text
//! cargo run --features cli --bin dump -- Saves/Slot1.sav
//! ```

use savetrack::gvas::SaveObject;
use savetrack::{Game, Reconciler, Section};
use std::collections::BTreeMap;
use std::io::{self, Write};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() != 2 {
        eprintln!("usage: {} <save file>", args[0]);
        std::process::exit(2);
    }

    let data = std::fs::read(&args[1])?;
    let save = match SaveObject::from_vec(data) {
        Ok(x) => x,
        Err(e) if e.is_decode() => {
            eprintln!("incompatible or corrupt save file: {}", e);
            std::process::exit(1);
        }
        Err(e) => return Err(e.into()),
    };

    let scan = Reconciler::new(Game::Siu).scan(&save);
    let sections: BTreeMap<&str, Vec<&str>> = Section::LISTS
        .iter()
        .chain(std::iter::once(&Section::ActorState))
        .map(|section| {
            let keys = scan.keys_in(*section).map(|x| x.as_str()).collect();
            (section.name(), keys)
        })
        .collect();

    let out = serde_json::json!({
        "header": save.header(),
        "properties": save.properties(),
        "diagnostics": save.diagnostics(),
        "sections": sections,
        "scalars": scan.scalars,
        "player_position": save.player_position(),
    });

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    serde_json::to_writer_pretty(&mut handle, &out)?;
    writeln!(handle)?;
    Ok(())
}
