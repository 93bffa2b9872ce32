use std::ffi::OsStr;
use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;
use std::process;

use anyhow::{self as any, Context};
use autoshader::Options;
use autoshader_spirv::Module;
use clap::{App, Arg, ArgMatches};
use log::info;

const FAILURE: i32 = 10;

fn app() -> App<'static, 'static> {
    App::new("autoshader")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Generates Rust bindings for Vulkan from SPIR-V modules")
        .arg(Arg::with_name("inputs")
            .value_name("MODULE")
            .multiple(true)
            .help("SPIR-V modules to read; reads one module from stdin if omitted"))
        .arg(Arg::with_name("output")
            .short("o")
            .long("output")
            .value_name("FILE")
            .takes_value(true)
            .help("Writes the bindings to FILE instead of stdout"))
        .arg(Arg::with_name("vertex")
            .short("v")
            .long("vertex")
            .value_name("NAME")
            .takes_value(true)
            .default_value("Vertex")
            .help("Name of the generated vertex struct"))
        .arg(Arg::with_name("no-vertex")
            .long("no-vertex")
            .help("Skips the vertex struct and input descriptions"))
        .arg(Arg::with_name("no-source")
            .long("no-source")
            .help("Passes module code to Components::new instead of embedding it"))
        .arg(Arg::with_name("module")
            .long("module")
            .value_name("NAME")
            .takes_value(true)
            .multiple(true)
            .number_of_values(1)
            .help("Wraps the output in `pub mod NAME`; repeat to nest"))
}

fn options(matches: &ArgMatches<'_>) -> Options {
    let defaults = Options::default();
    Options {
        vertex_name: matches.value_of("vertex")
            .map_or(defaults.vertex_name, str::to_owned),
        vertex: !matches.is_present("no-vertex"),
        source: !matches.is_present("no-source"),
        modules: matches.values_of("module")
            .map_or_else(Vec::new, |names| names.map(str::to_owned).collect()),
    }
}

fn read_module(path: &OsStr) -> any::Result<Module> {
    let path = Path::new(path);
    let bytes = fs::read(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let module = autoshader_spirv::parse_bytes(&bytes)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    info!("read {} ({} words)", path.display(), module.words().len());
    Ok(module)
}

fn read_stdin() -> any::Result<Module> {
    let mut bytes = Vec::new();
    io::stdin().read_to_end(&mut bytes).context("failed to read stdin")?;
    autoshader_spirv::parse_bytes(&bytes).context("failed to parse stdin")
}

fn run(matches: &ArgMatches<'_>) -> any::Result<()> {
    let options = options(matches);
    let modules = match matches.values_of_os("inputs") {
        Some(paths) => paths.map(read_module).collect::<any::Result<Vec<_>>>()?,
        None => vec![read_stdin()?],
    };

    let source = autoshader::generate(&modules, &options)?;
    match matches.value_of_os("output") {
        Some(path) => {
            let path = Path::new(path);
            fs::write(path, &source)
                .with_context(|| format!("failed to write {}", path.display()))?;
        },
        None => io::stdout().write_all(source.as_bytes())?,
    }
    Ok(())
}

fn main() {
    env_logger::init();
    let matches = app().get_matches();
    if let Err(err) = run(&matches) {
        eprintln!("autoshader failed: {:#}", err);
        process::exit(FAILURE);
    }
}
