use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context;
use lurker_client::{HttpTransport, ProgressObserver, Session};

mod report;

#[derive(structopt::StructOpt)]
struct Opt {
    /// File containing the access token
    #[structopt(long, default_value = "token.txt")]
    token_file: PathBuf,

    #[structopt(subcommand)]
    cmd: Command,
}

#[derive(structopt::StructOpt)]
enum Command {
    /// Resolve a group and print its name
    Resolve {
        /// Group id or short name
        group: String,
    },

    /// Find subscribers with no likes and no comments on recent posts
    Sweep {
        /// Group id or short name
        group: String,

        /// How many recent posts to sample
        #[structopt(long)]
        posts: u64,

        /// Request budget, in calls per second
        #[structopt(long, default_value = "3")]
        rps: u32,

        /// Where to write the report
        #[structopt(long, default_value = "inactive.txt")]
        out: PathBuf,

        /// Also remove the inactive subscribers once found
        #[structopt(long)]
        delete: bool,
    },
}

fn read_token(path: &Path) -> Option<String> {
    match std::fs::read_to_string(path) {
        Ok(token) => Some(token.trim().to_string()),
        Err(err) => {
            tracing::warn!(path = %path.display(), %err, "no token file, running without credentials");
            None
        }
    }
}

struct LogProgress;

impl ProgressObserver for LogProgress {
    fn on_progress(&self, completed: u64, queued: usize) {
        tracing::info!(completed, queued, "working");
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let opt = <Opt as structopt::StructOpt>::from_args();

    tokio::select! {
        res = run(opt) => res,
        _ = tokio::signal::ctrl_c() => {
            // In-flight calls go down with the process; a half-finished sweep
            // has no partial-resume.
            tracing::warn!("interrupted, aborting");
            std::process::exit(130);
        }
    }
}

async fn run(opt: Opt) -> anyhow::Result<()> {
    let token = read_token(&opt.token_file);
    let mut session = Session::new(Arc::new(HttpTransport::new(token)));

    match opt.cmd {
        Command::Resolve { group } => match session.find_group(&group).await? {
            Some(name) => println!("{name}"),
            None => println!("group {group:?} not found"),
        },
        Command::Sweep {
            group,
            posts,
            rps,
            out,
            delete,
        } => {
            let name = session
                .find_group(&group)
                .await?
                .with_context(|| format!("group {group:?} not found"))?;

            let inactive = session.find_inactive(posts, rps, &LogProgress).await?;
            println!("{}: {} inactive subscribers", name, inactive.len());

            let records = session.users_info(&inactive).await?;
            report::write_report(&out, &inactive, &records)
                .with_context(|| format!("writing report to {}", out.display()))?;

            if delete {
                let stats = session.delete_inactive(rps, &LogProgress).await?;
                println!("removed {stats}");
            }
        }
    }

    Ok(())
}
