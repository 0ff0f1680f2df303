use std::error::Error;
use std::fs::File;
use std::io::{BufWriter, Write};

use clap::{App, Arg};
use meshmorph::prelude::*;
use meshmorph::utils::log::{info, init_logger, LevelFilter};

fn main() -> Result<(), Box<dyn Error>> {
    let matches = App::new("meshmorph-flatten")
        .about("Flattens an FBX scene into a single triangle mesh and dumps it as JSON.")
        .arg(
            Arg::with_name("input")
                .required(true)
                .index(1)
                .help("FBX file to import"),
        )
        .arg(
            Arg::with_name("output")
                .short("o")
                .long("output")
                .takes_value(true)
                .help("JSON file to write, standard output when omitted"),
        )
        .arg(
            Arg::with_name("handedness")
                .long("handedness")
                .takes_value(true)
                .possible_values(&["right", "left"])
                .default_value("right"),
        )
        .arg(
            Arg::with_name("front")
                .long("front")
                .takes_value(true)
                .possible_values(&["x", "y", "z"])
                .default_value("x")
                .help("Front axis of the target system, the front vector points along -axis"),
        )
        .arg(
            Arg::with_name("up")
                .long("up")
                .takes_value(true)
                .possible_values(&["x", "y", "z"])
                .default_value("z"),
        )
        .arg(
            Arg::with_name("native-axes")
                .long("native-axes")
                .help("Keep the axis system the file was authored in"),
        )
        .arg(
            Arg::with_name("import-id")
                .long("import-id")
                .takes_value(true)
                .help("Session id of the import, random when omitted"),
        )
        .arg(
            Arg::with_name("t0")
                .long("t0")
                .help("Deform skinned meshes in their pose at time zero"),
        )
        .get_matches();

    init_logger(LevelFilter::Info);

    let mut settings = ImportSettings::default()
        .with_handedness(matches.value_of("handedness").unwrap_or("right").parse()?)
        .with_front_axis(matches.value_of("front").unwrap_or("x").parse()?)
        .with_up_axis(matches.value_of("up").unwrap_or("z").parse()?)
        .with_convert_scene(!matches.is_present("native-axes"))
        .with_use_t0(matches.is_present("t0"));
    if let Some(id) = matches.value_of("import-id") {
        settings = settings.with_import_id(id.parse()?);
    }

    let input = matches.value_of("input").ok_or("missing input file")?;
    let context = ImportContext::new();
    let import = FbxImport::try_new(&context, input, settings)?;

    let mut timer = Timer::new();
    let mesh = import.mesh();
    match matches.value_of("output") {
        Some(path) => {
            let mut writer = BufWriter::new(File::create(path)?);
            serde_json::to_writer(&mut writer, mesh)?;
            writer.flush()?;
            info!("wrote {} to {} in {:.2} ms", mesh, path, timer.lap());
        }
        None => {
            let stdout = std::io::stdout();
            let mut writer = stdout.lock();
            serde_json::to_writer_pretty(&mut writer, mesh)?;
            writeln!(writer)?;
        }
    }

    for (name, nodes) in import.collision_models().iter() {
        info!("collision models for {}: {}", name, nodes.len());
    }

    Ok(())
}
