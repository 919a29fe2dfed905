use anyhow::Context;
use clap::Parser;
use leaderboard::core::poll_scheduler::{BatchOutcome, PollScheduler};
use leaderboard::interfaces::json_sources::{JsonFeed, JsonRegistry};
use leaderboard::post::export::write_csv_to_file;
use leaderboard::post::ranked_view::RankedView;
use leaderboard::pre::board_opts::BoardOpts;
use leaderboard::pre::read_board_pars::load_board_pars;
use std::sync::Arc;
use std::time::Instant;

fn init_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_secs()
        .init();
}

/// show_view prints the leaderboard and writes the requested export files.
fn show_view(view: &RankedView, opts: &BoardOpts) -> anyhow::Result<()> {
    print!("{}", view.standings_text()?);

    if let Some(path) = &opts.export {
        let written = write_csv_to_file(view, path)
            .context(format!("Failed to write CSV export {}!", path.display()))?;
        log::info!("CSV export written to {}", written);
    }
    if let Some(path) = &opts.json {
        let written = view
            .write_json(path)
            .context(format!("Failed to write JSON export {}!", path.display()))?;
        log::info!("JSON export written to {}", written);
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    // PRE-PROCESSING ------------------------------------------------------------------------------
    // get board options from the command line arguments
    let opts: BoardOpts = BoardOpts::parse();
    init_logging(opts.debug);

    // get board parameters
    log::info!("Reading board parameters from {:?}", opts.parfile_path);
    let pars = load_board_pars(&opts)?;

    let registry = Arc::new(JsonRegistry::new(&pars.roster_path));
    let feed = Arc::new(JsonFeed::new(&pars.feed_dir));
    let mut scheduler = PollScheduler::new(registry, feed).with_max_backoff(pars.max_backoff());

    // EXECUTION -----------------------------------------------------------------------------------
    if opts.once {
        // SINGLE BATCH - no timer, exit after the exports are written
        let t_start = Instant::now();
        let outcome = scheduler
            .switch_race(&pars.race_id)?
            .join()
            .map_err(|_| anyhow::anyhow!("Batch thread panicked!"))??;
        log::info!("Execution time: {}ms", t_start.elapsed().as_millis());

        match outcome {
            BatchOutcome::Published(view) => show_view(&view, &opts)?,
            other => anyhow::bail!("Batch did not publish a leaderboard: {:?}", other),
        }
    } else {
        // LIVE - print and export every published leaderboard until interrupted
        let updates = scheduler.subscribe();
        let _first_batch = scheduler.start(&pars.race_id, pars.interval())?;

        loop {
            let view = updates
                .recv()
                .context("Scheduler stopped publishing leaderboards!")?;
            show_view(&view, &opts)?;
        }
    }

    Ok(())
}
