use clap::{Arg, Command};
use indicatif::{MultiProgress, ProgressBar};
use indicatif_log_bridge::LogWrapper;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use libtrigbank::job::JobConfig;
use libtrigbank::process::process;

fn make_template_job(path: &Path) {
    let job = JobConfig::default();
    let yaml_str = serde_yaml::to_string(&job).unwrap();
    let mut file = File::create(path).expect("Could create template job file!");
    file.write_all(yaml_str.as_bytes())
        .expect("Failed to write yaml data to file!");
}

fn main() {
    // Create a cli
    let matches = Command::new("trigbank_cli")
        .arg_required_else_help(true)
        .subcommand(Command::new("new").about("Make a template job yaml file"))
        .arg(
            Arg::new("path")
                .short('p')
                .long("path")
                .help("Path to the file"),
        )
        .get_matches();

    // Initialize feedback
    let logger = simplelog::TermLogger::new(
        simplelog::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    );

    let pb_manager = MultiProgress::new();

    LogWrapper::new(pb_manager.clone(), logger)
        .try_init()
        .expect("Could not create logging/progress!");

    // Parse the cli
    let job_path = PathBuf::from(matches.get_one::<String>("path").expect("We require args"));

    if let Some(("new", _)) = matches.subcommand() {
        log::info!(
            "Making a template job at {}...",
            job_path.to_string_lossy()
        );

        make_template_job(&job_path);
        log::info!("Done.");
        return;
    }

    // Load our job
    log::info!("Loading job from {}...", job_path.to_string_lossy());
    let job = match JobConfig::read_job_file(&job_path) {
        Ok(j) => j,
        Err(e) => {
            log::error!("{e}");
            return;
        }
    };
    log::info!("Job successfully loaded.");
    log::info!("Dump Path: {}", job.dump_path.to_string_lossy());
    log::info!("Table Path: {}", job.table_path.to_string_lossy());
    match &job.channel_map_path {
        Some(path) => log::info!("Channel Map Path: {}", path.to_string_lossy()),
        None => log::info!("Channel Map: bundled default"),
    }
    log::info!("Run Number: {}", job.run_number);

    // Setup the progress bar
    let pb = pb_manager.add(ProgressBar::new(100));
    let status = Arc::new(Mutex::new(0.0));
    let sent_status = status.clone();
    // Spawn the task!
    let handle = std::thread::spawn(move || process(job, sent_status));

    loop {
        // Ugh since we don't have a UI here, I manually sleep for ~ 1 sec before trying to update
        std::thread::sleep(std::time::Duration::from_secs(1));
        match status.lock() {
            Ok(stat) => pb.set_position((*stat * 100.0) as u64),
            Err(e) => log::error!("{e}"),
        }

        if handle.is_finished() {
            match handle.join() {
                Ok(result) => match result {
                    Ok(summary) => {
                        log::info!(
                            "Successfully decoded {} banks ({} dropped)!",
                            summary.banks_read,
                            summary.failed_banks
                        );
                        let mut counts: Vec<_> = summary.primitive_counts.iter().collect();
                        counts.sort();
                        for (kind, count) in counts {
                            log::info!("  {kind}: {count}");
                        }
                        if let Some(record) = summary.first_timestamp {
                            log::info!("First event header: {record}");
                        }
                        if summary.config.is_none() {
                            log::warn!("No complete configuration was published for this run.");
                        }
                    }
                    Err(e) => log::error!("Decoding failed with error: {e}"),
                },
                Err(_) => log::error!("Failed to join decoding task!"),
            }
            break;
        }
    }

    pb.finish();

    log::info!("Done.");
}
