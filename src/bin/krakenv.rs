//! Command-line interface for krakenv
//! Validates, inspects and generates environment files from an annotated distributable.
//!
//! Usage:
//!   krakenv init [--path `<path>`] [--environments `<list>`]       - Write a new distributable
//!   krakenv add `<NAME>` [--type `<t>`] [--prompt `<p>`] ...          - Append an annotated variable
//!   krakenv validate `<target>` [--dist `<path>`] [--strict]      - Validate values against annotations
//!   krakenv inspect `<target>` [--format `<f>`] [--sync]          - Compare a target with the distributable
//!   krakenv check [--dist `<path>`]                              - Report annotation syntax problems
//!   krakenv generate `<target>`|--all [--set KEY=VALUE]...       - Write target files non-interactively

use clap::{Arg, ArgAction, ArgMatches, Command};
use krakenv::generate::Generator;
use krakenv::inspect::inspect;
use krakenv::project::{parse_environments, DEFAULT_DIST_PATH};
use krakenv::scaffold::{append_variable, new_variable, template_lines, ScaffoldError};
use krakenv::settings::{Loader, Overrides, ReportFormat, Settings};
use krakenv::validation::{diagnose, validate_against, ValidationReport};
use krakenv::{Annotation, Constraint, ConstraintKind, Document, ProjectConfig, VariableType};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Validation or inspection found problems
const EXIT_INVALID: i32 = 1;
/// Input is unreadable, malformed or incomplete
const EXIT_INPUT: i32 = 2;

const VARIABLE_TYPES: [&str; 6] = ["string", "int", "numeric", "boolean", "enum", "object"];

/// `add` flags and the constraint each one becomes
const CONSTRAINT_ARGS: [(&str, ConstraintKind); 7] = [
    ("min", ConstraintKind::Min),
    ("max", ConstraintKind::Max),
    ("minlen", ConstraintKind::MinLen),
    ("maxlen", ConstraintKind::MaxLen),
    ("pattern", ConstraintKind::Pattern),
    ("options", ConstraintKind::Options),
    ("object-format", ConstraintKind::Format),
];

fn main() {
    let matches = build_cli().get_matches();
    init_logging(matches.get_flag("verbose"));

    let Some((name, sub_matches)) = matches.subcommand() else {
        unreachable!("subcommand is required");
    };

    let settings = match load_settings(&matches, sub_matches) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error: invalid settings: {}", e);
            std::process::exit(EXIT_INPUT);
        }
    };

    let code = match name {
        "init" => handle_init_command(sub_matches, &settings),
        "add" => handle_add_command(sub_matches, &settings),
        "validate" => handle_validate_command(sub_matches, &settings),
        "inspect" => handle_inspect_command(sub_matches, &settings),
        "check" => handle_check_command(&settings),
        "generate" => handle_generate_command(sub_matches, &settings),
        _ => unreachable!(),
    };

    if code != 0 {
        std::process::exit(code);
    }
}

fn build_cli() -> Command {
    let dist_arg = || {
        Arg::new("dist")
            .long("dist")
            .short('d')
            .help("Path to the distributable (defaults to the dist_path setting)")
    };
    let target_arg = || {
        Arg::new("target")
            .help("Path to the target environment file")
            .required(true)
            .index(1)
    };

    Command::new("krakenv")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Validate and generate environment files from an annotated distributable")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .global(true)
                .help("Settings file layered over the defaults and .krakenv.toml"),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Log skipped lines and dropped annotations"),
        )
        .subcommand(
            Command::new("init")
                .about("Create a new distributable with a config block and syntax header")
                .arg(
                    Arg::new("path")
                        .long("path")
                        .short('p')
                        .help("Output path (defaults to the dist_path setting)"),
                )
                .arg(
                    Arg::new("environments")
                        .long("environments")
                        .short('e')
                        .default_value("local")
                        .help("Comma-separated environments"),
                )
                .arg(
                    Arg::new("force")
                        .long("force")
                        .short('f')
                        .action(ArgAction::SetTrue)
                        .help("Overwrite an existing file"),
                )
                .arg(
                    Arg::new("template")
                        .long("template")
                        .short('t')
                        .action(ArgAction::SetTrue)
                        .help("Only write the file, without next-step hints"),
                ),
        )
        .subcommand(
            Command::new("add")
                .about("Append an annotated variable to the distributable")
                .arg(
                    Arg::new("name")
                        .help("Variable name (uppercase letters, digits, underscores)")
                        .required(true)
                        .index(1),
                )
                .arg(dist_arg())
                .arg(
                    Arg::new("type")
                        .long("type")
                        .short('t')
                        .value_parser(VARIABLE_TYPES)
                        .default_value("string")
                        .help("Variable type"),
                )
                .arg(
                    Arg::new("prompt")
                        .long("prompt")
                        .short('p')
                        .help("Prompt message"),
                )
                .arg(
                    Arg::new("default")
                        .long("default")
                        .short('D')
                        .allow_hyphen_values(true)
                        .help("Default value"),
                )
                .arg(
                    Arg::new("min")
                        .long("min")
                        .allow_negative_numbers(true)
                        .help("Minimum value (int/numeric)"),
                )
                .arg(
                    Arg::new("max")
                        .long("max")
                        .allow_negative_numbers(true)
                        .help("Maximum value (int/numeric)"),
                )
                .arg(Arg::new("minlen").long("minlen").help("Minimum length (string)"))
                .arg(Arg::new("maxlen").long("maxlen").help("Maximum length (string)"))
                .arg(Arg::new("pattern").long("pattern").help("Regex pattern (string)"))
                .arg(
                    Arg::new("options")
                        .long("options")
                        .short('o')
                        .help("Comma-separated options (enum)"),
                )
                .arg(
                    Arg::new("object-format")
                        .long("format")
                        .value_parser(["json", "yaml"])
                        .help("Object format"),
                )
                .arg(
                    Arg::new("optional")
                        .long("optional")
                        .action(ArgAction::SetTrue)
                        .help("Mark as optional"),
                )
                .arg(
                    Arg::new("secret")
                        .long("secret")
                        .action(ArgAction::SetTrue)
                        .help("Mark as secret"),
                ),
        )
        .subcommand(
            Command::new("validate")
                .about("Validate an environment file against the distributable annotations")
                .arg(target_arg())
                .arg(dist_arg())
                .arg(
                    Arg::new("strict")
                        .long("strict")
                        .short('s')
                        .action(ArgAction::SetTrue)
                        .help("Require every variable to have an annotation"),
                ),
        )
        .subcommand(
            Command::new("inspect")
                .about("Compare an environment file with the distributable")
                .arg(target_arg())
                .arg(dist_arg())
                .arg(
                    Arg::new("format")
                        .long("format")
                        .short('f')
                        .help("Report format: text or json"),
                )
                .arg(
                    Arg::new("sync")
                        .long("sync")
                        .short('s')
                        .action(ArgAction::SetTrue)
                        .help("Add missing variables that have a default or are optional"),
                ),
        )
        .subcommand(
            Command::new("check")
                .about("Report invalid names, malformed annotations and duplicates in the distributable")
                .arg(dist_arg()),
        )
        .subcommand(
            Command::new("generate")
                .about("Generate environment files from the distributable")
                .arg(
                    Arg::new("target")
                        .help("Path to the target environment file")
                        .required_unless_present("all")
                        .index(1),
                )
                .arg(dist_arg())
                .arg(
                    Arg::new("all")
                        .long("all")
                        .short('a')
                        .action(ArgAction::SetTrue)
                        .conflicts_with("target")
                        .help("Generate .env.<environment> for every configured environment"),
                )
                .arg(
                    Arg::new("set")
                        .long("set")
                        .action(ArgAction::Append)
                        .value_name("KEY=VALUE")
                        .help("Value for a variable (repeatable)"),
                )
                .arg(
                    Arg::new("keep-annotations")
                        .long("keep-annotations")
                        .short('k')
                        .action(ArgAction::SetTrue)
                        .help("Copy annotations into the generated file"),
                )
                .arg(
                    Arg::new("force")
                        .long("force")
                        .short('f')
                        .action(ArgAction::SetTrue)
                        .help("Write even when required variables have no value"),
                )
                .arg(
                    Arg::new("stdout")
                        .long("stdout")
                        .action(ArgAction::SetTrue)
                        .help("Print the generated file instead of writing it"),
                ),
        )
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "krakenv=debug" } else { "krakenv=warn" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Layer defaults, `.krakenv.toml`, `--config` and command flags.
fn load_settings(
    matches: &ArgMatches,
    sub_matches: &ArgMatches,
) -> Result<Settings, config::ConfigError> {
    let config_file = matches.get_one::<String>("config").map(Path::new);
    let overrides = Overrides {
        dist_path: string_arg(sub_matches, "dist"),
        strict: flag_arg(sub_matches, "strict").then_some(true),
        keep_annotations: flag_arg(sub_matches, "keep-annotations").then_some(true),
        format: string_arg(sub_matches, "format"),
    };

    Loader::discover(config_file)
        .with_overrides(&overrides)?
        .build()
}

/// Value of an argument that only some subcommands define
fn string_arg(matches: &ArgMatches, id: &str) -> Option<String> {
    matches.try_get_one::<String>(id).ok().flatten().cloned()
}

fn flag_arg(matches: &ArgMatches, id: &str) -> bool {
    matches
        .try_get_one::<bool>(id)
        .ok()
        .flatten()
        .copied()
        .unwrap_or(false)
}

fn read_document(path: &str) -> Result<Document, i32> {
    Document::read(path).map_err(|e| {
        eprintln!("Error: {}", e);
        EXIT_INPUT
    })
}

/// The `distPath` a distributable declares for itself, when it names a
/// different file than the one being read.
fn declared_dist_path<'a>(dist: &'a Document, read_from: &str) -> Option<&'a str> {
    dist.config
        .as_ref()
        .map(|config| config.dist_path.as_str())
        .filter(|declared| *declared != DEFAULT_DIST_PATH && *declared != read_from)
}

fn read_dist(settings: &Settings) -> Result<Document, i32> {
    let dist = read_document(&settings.dist_path)?;
    if let Some(declared) = declared_dist_path(&dist, &settings.dist_path) {
        debug!(declared, read_from = %settings.dist_path, "distributable declares another distPath");
    }
    Ok(dist)
}

fn write_lines(path: &str, lines: &[String]) -> Result<(), i32> {
    let mut output = lines.join("\n");
    output.push('\n');
    fs::write(path, output).map_err(|e| {
        eprintln!("Error: failed to write {}: {}", path, e);
        EXIT_INPUT
    })
}

/// Handle the init command
fn handle_init_command(matches: &ArgMatches, settings: &Settings) -> i32 {
    let path = matches
        .get_one::<String>("path")
        .cloned()
        .unwrap_or_else(|| settings.dist_path.clone());

    if Path::new(&path).exists() && !matches.get_flag("force") {
        eprintln!("Error: file {} already exists (use --force to overwrite)", path);
        return EXIT_INVALID;
    }

    let environments = matches
        .get_one::<String>("environments")
        .map(|value| parse_environments(value))
        .unwrap_or_default();
    let config = ProjectConfig {
        environments,
        ..ProjectConfig::default()
    };

    if let Err(code) = write_lines(&path, &template_lines(&config)) {
        return code;
    }
    println!("✓ Created {}", path);

    if !matches.get_flag("template") {
        println!("\nTo add variables:");
        println!("  krakenv add VAR_NAME --type string --prompt \"Question?\"");
        println!("\nTo generate environment files:");
        println!("  krakenv generate .env.local");
    }

    0
}

/// Handle the add command
fn handle_add_command(matches: &ArgMatches, settings: &Settings) -> i32 {
    let Some(name) = matches.get_one::<String>("name") else {
        return EXIT_INPUT;
    };

    let content = match fs::read_to_string(&settings.dist_path) {
        Ok(content) => content,
        Err(e) => {
            eprintln!(
                "Error: failed to read {}: {} (run 'krakenv init' to create one)",
                settings.dist_path, e
            );
            return EXIT_INPUT;
        }
    };

    let var_type = matches
        .get_one::<String>("type")
        .map(|token| VariableType::from_token(token))
        .unwrap_or_default();
    let constraints = CONSTRAINT_ARGS
        .iter()
        .filter_map(|(id, kind)| {
            matches
                .get_one::<String>(id)
                .map(|value| Constraint::new(*kind, value.as_str()))
        })
        .collect();
    let annotation = Annotation {
        prompt_text: matches.get_one::<String>("prompt").cloned().unwrap_or_default(),
        var_type,
        constraints,
        is_optional: matches.get_flag("optional"),
        is_secret: matches.get_flag("secret"),
    };
    let default = matches
        .get_one::<String>("default")
        .map(String::as_str)
        .unwrap_or_default();

    let result = new_variable(name, default, annotation)
        .and_then(|variable| Ok((append_variable(&content, &variable)?, variable)));
    let (updated, variable) = match result {
        Ok(ok) => ok,
        Err(e @ ScaffoldError::InvalidName(_)) => {
            eprintln!("Error: {}", e);
            return EXIT_INVALID;
        }
        Err(e @ ScaffoldError::Duplicate(_)) => {
            eprintln!("Error: {} in {}", e, settings.dist_path);
            return EXIT_INPUT;
        }
    };

    if let Err(e) = fs::write(&settings.dist_path, updated) {
        eprintln!("Error: failed to write {}: {}", settings.dist_path, e);
        return EXIT_INPUT;
    }
    println!("✓ Added: {}", variable.to_line(true));

    0
}

/// Handle the validate command
fn handle_validate_command(matches: &ArgMatches, settings: &Settings) -> i32 {
    let Some(target_path) = matches.get_one::<String>("target") else {
        return EXIT_INPUT;
    };
    let (dist, target) = match (read_dist(settings), read_document(target_path)) {
        (Ok(dist), Ok(target)) => (dist, target),
        _ => return EXIT_INPUT,
    };

    let report = validate_against(&dist, &target, settings.validate.strict);
    print!("{}", report.format(target_path));

    if report.is_valid() {
        0
    } else {
        EXIT_INVALID
    }
}

/// Handle the inspect command
fn handle_inspect_command(matches: &ArgMatches, settings: &Settings) -> i32 {
    let Some(target_path) = matches.get_one::<String>("target") else {
        return EXIT_INPUT;
    };
    let (dist, target) = match (read_dist(settings), read_document(target_path)) {
        (Ok(dist), Ok(target)) => (dist, target),
        _ => return EXIT_INPUT,
    };

    let report = inspect(&dist, &target);

    if matches.get_flag("sync") {
        if report.missing.is_empty() {
            println!("Nothing to sync in {}", target_path);
            return 0;
        }
        return match report.sync(&target) {
            Ok(synced) => match write_lines(target_path, &synced.to_lines(true)) {
                Ok(()) => {
                    println!(
                        "✓ Synced {} variable(s) in {}",
                        report.missing.len(),
                        target_path
                    );
                    0
                }
                Err(code) => code,
            },
            Err(e) => {
                eprintln!("Error: cannot sync {}: {}", target_path, e);
                EXIT_INPUT
            }
        };
    }

    match settings.inspect.format {
        ReportFormat::Text => print!("{}", report.format_text()),
        ReportFormat::Json => match report.to_json() {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error: failed to serialize report: {}", e);
                return EXIT_INPUT;
            }
        },
    }

    0
}

/// Handle the check command
fn handle_check_command(settings: &Settings) -> i32 {
    let content = match fs::read_to_string(&settings.dist_path) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("Error: failed to read {}: {}", settings.dist_path, e);
            return EXIT_INPUT;
        }
    };

    let dist = Document::parse_str(&content, settings.dist_path.as_str());
    if let Some(declared) = declared_dist_path(&dist, &settings.dist_path) {
        eprintln!(
            "Note: {} declares distPath={}",
            settings.dist_path, declared
        );
    }

    let mut report = ValidationReport::new();
    report.extend(diagnose(content.lines()));
    print!("{}", report.format(&settings.dist_path));

    if report.is_valid() {
        0
    } else {
        EXIT_INVALID
    }
}

/// Handle the generate command
fn handle_generate_command(matches: &ArgMatches, settings: &Settings) -> i32 {
    let mut user_values = HashMap::new();
    for pair in matches.get_many::<String>("set").into_iter().flatten() {
        match pair.split_once('=') {
            Some((key, value)) => {
                user_values.insert(key.trim().to_string(), value.to_string());
            }
            None => {
                eprintln!("Error: expected KEY=VALUE, got {:?}", pair);
                return EXIT_INPUT;
            }
        }
    }

    let dist = match read_dist(settings) {
        Ok(dist) => dist,
        Err(code) => return code,
    };

    let targets = if matches.get_flag("all") {
        dist.config_or_default().environment_files()
    } else {
        matches.get_one::<String>("target").cloned().into_iter().collect()
    };

    let options = GenerateOptions {
        keep_annotations: settings.keep_annotations,
        force: matches.get_flag("force"),
        to_stdout: matches.get_flag("stdout"),
    };
    for target_path in &targets {
        let code = generate_target(&dist, target_path, &user_values, &options);
        if code != 0 {
            return code;
        }
    }

    0
}

struct GenerateOptions {
    keep_annotations: bool,
    force: bool,
    to_stdout: bool,
}

fn generate_target(
    dist: &Document,
    target_path: &str,
    user_values: &HashMap<String, String>,
    options: &GenerateOptions,
) -> i32 {
    let existing = if Path::new(target_path).exists() {
        match read_document(target_path) {
            Ok(target) => Some(target),
            Err(code) => return code,
        }
    } else {
        debug!(target_path, "no existing target file");
        None
    };

    let mut generator = Generator::new(dist).keep_annotations(options.keep_annotations);
    if let Some(target) = &existing {
        generator = generator.with_target(target);
    }

    if !options.force {
        if let Err(e) = generator.check_complete(user_values) {
            eprintln!("Error: cannot generate {}: {}", target_path, e);
            eprintln!("Pass --set NAME=VALUE, add defaults to the distributable or use --force");
            return EXIT_INPUT;
        }
    }

    let merged = match generator.merge(user_values) {
        Ok(merged) => merged,
        Err(e) => {
            eprintln!("Error: {}", e);
            return EXIT_INVALID;
        }
    };
    let lines = generator.render(&merged);

    if options.to_stdout {
        println!("{}", lines.join("\n"));
    } else {
        if let Err(code) = write_lines(target_path, &lines) {
            return code;
        }
        println!("Wrote {} variable(s) to {}", merged.len(), target_path);
    }

    let pending = generator.pending(user_values);
    if !pending.is_empty() {
        let names: Vec<_> = pending.iter().map(|v| v.name.as_str()).collect();
        eprintln!(
            "{} variable(s) still need a value: {}",
            names.len(),
            names.join(", ")
        );
    }

    0
}
