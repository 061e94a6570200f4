//! Terminal driver for the timebomb engine: a one-channel simulator
//! that reads scripted chatter from stdin, runs real timers, and renders
//! the engine's effects to stdout.

mod config;
mod host;
mod store;

use std::io::Write as _;
use std::path::PathBuf;
use std::sync::Arc;

use bot_modules_timebomb::{GameController, HistoryStore, MemoryHistoryStore, SettingsSource};
use clap::Parser;
use fusecore::{Channel, Directory as _, Effect, Outcome, Reply};
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser)]
#[command(
    name = "fusebot",
    about = "Terminal driver for the timebomb minigame engine"
)]
struct Args {
    /// Per-channel settings file (YAML).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Channel the simulated session runs in.
    #[arg(long, default_value = "#lounge")]
    channel: String,

    /// Nick the bot itself uses.
    #[arg(long, default_value = "fusebot")]
    nick: String,

    /// RNG seed, for reproducible games.
    #[arg(long)]
    seed: Option<u64>,

    /// JSON file for durable bomb history; in-memory when omitted.
    #[arg(long)]
    history: Option<PathBuf>,
}

fn init_logging() {
    let default_filter = "fusebot=info,bot_modules_timebomb=info".to_string();
    let mut env_builder = env_logger::builder();
    env_builder
        .format(|buf, record| {
            writeln!(
                buf,
                "({}) {} - {}",
                record.target(),
                record.level(),
                record.args()
            )
        })
        .parse_filters(&std::env::var("RUST_LOG").unwrap_or(default_filter));
    env_builder.init();
}

#[tokio::main]
async fn main() {
    init_logging();
    let args = Args::parse();
    if let Err(e) = run(args).await {
        log::error!("fatal: {}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), fusecore::Error> {
    let channel = Channel::new(&args.channel);
    let settings = Arc::new(config::FileSettings::load(args.config.as_deref())?);
    let directory = Arc::new(host::SimDirectory::new(&args.nick));
    directory.join(&channel, &args.nick);

    let (tx, mut timer_rx) = tokio::sync::mpsc::unbounded_channel();
    let scheduler = Arc::new(host::TokioScheduler::new(tx));
    let store: Arc<dyn HistoryStore> = match args.history {
        Some(path) => Arc::new(store::JsonHistoryStore::new(path)),
        None => Arc::new(MemoryHistoryStore::default()),
    };
    let mut game = GameController::new(
        directory.clone(),
        scheduler,
        settings.clone(),
        store,
    );
    if let Some(seed) = args.seed {
        game = game.with_seed(seed);
    }

    println!("fusebot simulator in {channel}.");
    println!("  join <nick> | part <nick> | say [@]<nick> <text> | status | quit");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            Some(event) = timer_rx.recv() => {
                deliver(&directory, &game.on_timer(event));
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if !handle_line(&game, &directory, settings.as_ref(), &channel, line.trim()) {
                    break;
                }
            }
        }
    }
    Ok(())
}

/// One stdin line. Returns `false` on `quit`.
fn handle_line(
    game: &GameController,
    dir: &host::SimDirectory,
    settings: &config::FileSettings,
    channel: &Channel,
    line: &str,
) -> bool {
    let mut parts = line.split_whitespace();
    match parts.next() {
        None => true,
        Some("quit") => false,
        Some("status") => {
            game.inspect(channel, |session| match session {
                Some(s) if s.is_live() => println!(
                    "bomb: {} on {} (from {}), wires {:?}, due {}",
                    s.state(),
                    s.victim(),
                    s.sender(),
                    s.wires(),
                    s.deadline()
                ),
                Some(s) => println!("last bomb settled: {}", s.state()),
                None => println!("no bomb yet"),
            });
            true
        }
        Some("join") => {
            if let Some(nick) = parts.next() {
                dir.join(channel, nick);
                game.note_join(channel, nick);
                println!("* {nick} joined {channel}");
            }
            true
        }
        Some("part") => {
            if let Some(nick) = parts.next() {
                dir.part(channel, nick);
                println!("* {nick} left {channel}");
            }
            true
        }
        Some("say") => {
            let Some(speaker) = parts.next() else {
                println!("usage: say [@]<nick> <text>");
                return true;
            };
            let (privileged, nick) = match speaker.strip_prefix('@') {
                Some(bare) => (true, bare),
                None => (false, speaker),
            };
            if !dir.is_present(channel, nick) {
                println!("({nick} is not in {channel}; use 'join {nick}' first)");
                return true;
            }
            let text = parts.collect::<Vec<_>>().join(" ");
            game.note_message(channel, nick);
            let prefix = settings.settings_for(channel).command_prefix;
            dispatch(game, dir, channel, nick, privileged, &text, &prefix);
            true
        }
        Some(other) => {
            println!("unknown command: {other}");
            true
        }
    }
}

/// Routes a channel message into the engine when it is one of the game
/// commands; anything else is just chatter.
fn dispatch(
    game: &GameController,
    dir: &host::SimDirectory,
    channel: &Channel,
    nick: &str,
    privileged: bool,
    text: &str,
    prefix: &str,
) {
    let Some(rest) = text.strip_prefix(prefix) else {
        return;
    };
    let mut words = rest.split_whitespace();
    let Some(command) = words.next() else {
        return;
    };
    let result = match command {
        "timebomb" => match words.next() {
            Some(target) => game.create_direct(channel, nick, target, privileged),
            None => {
                bot_reply(dir, channel, "usage: timebomb <nick>");
                return;
            }
        },
        "randombomb" => {
            let picks: Vec<String> = words.map(str::to_string).collect();
            game.create_random(channel, nick, &picks)
        }
        "cutwire" => match words.next() {
            Some(color) => game.cut_wire(channel, nick, color, privileged),
            None => {
                bot_reply(dir, channel, "usage: cutwire <color>");
                return;
            }
        },
        "duck" => Ok(game.dodge(channel, nick)),
        "detonate" => {
            if !privileged {
                bot_reply(dir, channel, "You need to be a channel operator to do that.");
                return;
            }
            game.force_detonate(channel)
        }
        "defuse" => {
            if !privileged {
                bot_reply(dir, channel, "You need to be a channel operator to do that.");
                return;
            }
            Ok(game.force_defuse(channel, nick, privileged))
        }
        _ => return,
    };
    match result {
        Ok(reply) => render_reply(dir, channel, reply),
        Err(e) => log::error!("{} failed: {}", command, e),
    }
}

fn render_reply(dir: &host::SimDirectory, channel: &Channel, reply: Reply) {
    match reply.outcome {
        Outcome::Ok => {}
        Outcome::Rejected(rejection) => bot_reply(dir, channel, &rejection.to_string()),
        Outcome::NotFound => bot_reply(dir, channel, "There is no active bomb."),
    }
    deliver(dir, &reply.effects);
}

fn bot_reply(dir: &host::SimDirectory, channel: &Channel, text: &str) {
    println!("[{channel}] <{}> {text}", dir.own_nick());
}

/// Prints effects IRC-log style and keeps the simulated membership in
/// step with kicks.
fn deliver(dir: &host::SimDirectory, effects: &[Effect]) {
    for effect in effects {
        match effect {
            Effect::Say { channel, text } => {
                println!("[{channel}] <{}> {text}", dir.own_nick());
            }
            Effect::Action { channel, text } => {
                println!("[{channel}] * {} {text}", dir.own_nick());
            }
            Effect::Kick {
                channel,
                nick,
                reason,
            } => {
                dir.part(channel, nick);
                println!("[{channel}] ! {nick} was kicked ({reason})");
            }
            Effect::Invite { channel, nick } => {
                println!("[{channel}] ! {nick} was invited back");
            }
        }
    }
}
