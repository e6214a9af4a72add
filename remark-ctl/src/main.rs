use std::{
    collections::BTreeMap,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
    rc::Rc,
};

use anyhow::Context;
use remark_client::{
    api::{PostId, SiteId},
    register_comment_store, CommentStore, Dispatcher, FetchQueue,
};

#[derive(structopt::StructOpt)]
struct Opt {
    #[structopt(subcommand)]
    cmd: Command,
}

#[derive(structopt::StructOpt)]
enum Command {
    /// Replay an action log and print what the store knows about one post
    Replay {
        /// JSON-lines file of dispatched payloads, `-` for stdin
        #[structopt(parse(from_os_str))]
        log: PathBuf,

        #[structopt(long)]
        site: u64,

        #[structopt(long)]
        post: u64,
    },

    /// Replay an action log and print the whole cache
    Dump {
        /// JSON-lines file of dispatched payloads, `-` for stdin
        #[structopt(parse(from_os_str))]
        log: PathBuf,
    },
}

fn open_log(path: &Path) -> anyhow::Result<Box<dyn BufRead>> {
    if path == Path::new("-") {
        return Ok(Box::new(BufReader::new(std::io::stdin())));
    }
    let file = std::fs::File::open(path)
        .with_context(|| format!("opening action log {}", path.display()))?;
    Ok(Box::new(BufReader::new(file)))
}

/// Dispatches every payload of the log, in order. Returns the number of
/// payloads dispatched.
fn replay(log: &Path, dispatcher: &Dispatcher) -> anyhow::Result<usize> {
    let mut dispatched = 0;
    for (i, line) in open_log(log)?.lines().enumerate() {
        let line = line.with_context(|| format!("reading line {} of action log", i + 1))?;
        if line.trim().is_empty() {
            continue;
        }
        let payload: serde_json::Value = serde_json::from_str(&line)
            .with_context(|| format!("parsing line {} of action log as json", i + 1))?;
        dispatcher
            .dispatch(&payload)
            .with_context(|| format!("dispatching line {} of action log", i + 1))?;
        dispatched += 1;
    }
    Ok(dispatched)
}

fn print_json(value: &impl serde::Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("serializing output")?;
    println!("{out}");
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let opt = <Opt as structopt::StructOpt>::from_args();

    let fetches = FetchQueue::new();
    let store = Rc::new(CommentStore::new(fetches.clone()));
    let dispatcher = Dispatcher::new();
    register_comment_store(&dispatcher, store.clone());

    match opt.cmd {
        Command::Replay { log, site, post } => {
            let n = replay(&log, &dispatcher)?;
            tracing::info!(payloads = n, "replayed action log");
            let (site_id, post_id) = (SiteId(site), PostId(post));
            print_json(&serde_json::json!({
                "comments": store.get_comments_for_post(site_id, post_id),
                "count": store.get_comment_count_for_post(site_id, post_id),
                "errors": store.get_errors_for_post(site_id, post_id),
                "fetchRequests": fetches.drain(),
            }))?;
        }
        Command::Dump { log } => {
            let n = replay(&log, &dispatcher)?;
            tracing::info!(payloads = n, "replayed action log");
            let all = store
                .all()
                .into_iter()
                .map(|(k, c)| (k.to_string(), c))
                .collect::<BTreeMap<_, _>>();
            print_json(&all)?;
        }
    }

    Ok(())
}
