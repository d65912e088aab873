use sigtap::{load_layouts, map_declared_type, FileNaming, FsDirectory, SourceEncoding};
use std::collections::BTreeSet;
use std::env;

fn main() -> anyhow::Result<()> {
    // Expect the directory holding the layout files, optionally its encoding
    let args: Vec<String> = env::args().collect();
    if !(2..=3).contains(&args.len()) {
        eprintln!("Usage: {} <sigtap_dir> [utf-8|latin1]", args[0]);
        std::process::exit(1);
    }
    let encoding: SourceEncoding = match args.get(2) {
        Some(enc) => enc.parse()?,
        None => SourceEncoding::default(),
    };

    let layouts = load_layouts(&FsDirectory::new(&args[1]), &FileNaming::default(), encoding)?;

    // Collect unique declared types
    let declared: BTreeSet<Option<String>> = layouts
        .values()
        .flat_map(|l| l.columns().iter().map(|c| c.declared_type().map(str::to_string)))
        .collect();

    println!("declared_type,target_type");
    for ty in declared {
        match ty {
            Some(t) => println!("{},{}", t, map_declared_type(&t)),
            None => println!("<none>,{}", sigtap::TargetType::Text),
        }
    }

    Ok(())
}
