use std::sync::Arc;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{
    backend::{VoiceRelay, voice::VoiceRequest},
    common::types::{ChannelId, GuildId, UserId},
    player::PlaybackState,
    protocol::models::VoiceState,
    server::{Commands, PlayOutcome},
};

const HELP: &str = "\
Commands:
  play <guild> <channel> [@user] <query...>
  search <query...>
  skip | pause | resume | toggle | stop | loop | queue <guild>
  voice <guild> <session_id> <token> <endpoint>
  help
  quit";

#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    Play {
        guild_id: GuildId,
        channel_id: ChannelId,
        /// Falls back to the console operator.
        requester: Option<UserId>,
        query: String,
    },
    Search(String),
    Skip(GuildId),
    Pause(GuildId),
    Resume(GuildId),
    Toggle(GuildId),
    Stop(GuildId),
    Loop(GuildId),
    Queue(GuildId),
    Voice {
        guild_id: GuildId,
        state: VoiceState,
    },
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("unknown command '{0}', try 'help'")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error("'{0}' is not a channel id")]
    InvalidChannel(String),
    #[error("'{0}' is not a user id")]
    InvalidUser(String),
}

/// Parse one input line. Blank lines parse to `None`.
pub fn parse(line: &str) -> Result<Option<ConsoleCommand>, ParseError> {
    let mut words = line.split_whitespace();
    let Some(name) = words.next() else {
        return Ok(None);
    };

    let guild = |words: &mut std::str::SplitWhitespace<'_>, usage| {
        words
            .next()
            .map(GuildId::from)
            .ok_or(ParseError::Usage(usage))
    };

    let command = match name.to_ascii_lowercase().as_str() {
        "play" => {
            const USAGE: &str = "play <guild> <channel> [@user] <query...>";
            let guild_id = guild(&mut words, USAGE)?;
            let channel = words.next().ok_or(ParseError::Usage(USAGE))?;
            let channel_id = channel
                .parse::<u64>()
                .map(ChannelId)
                .map_err(|_| ParseError::InvalidChannel(channel.to_string()))?;
            let mut rest: Vec<&str> = words.collect();
            let requester = match rest.first().copied().and_then(|word| word.strip_prefix('@')) {
                Some(user) => {
                    let user = user
                        .parse::<u64>()
                        .map(UserId)
                        .map_err(|_| ParseError::InvalidUser(user.to_string()))?;
                    rest.remove(0);
                    Some(user)
                }
                None => None,
            };
            let query = rest.join(" ");
            if query.is_empty() {
                return Err(ParseError::Usage(USAGE));
            }
            ConsoleCommand::Play {
                guild_id,
                channel_id,
                requester,
                query,
            }
        }
        "search" => {
            let query = words.collect::<Vec<_>>().join(" ");
            if query.is_empty() {
                return Err(ParseError::Usage("search <query...>"));
            }
            ConsoleCommand::Search(query)
        }
        "skip" => ConsoleCommand::Skip(guild(&mut words, "skip <guild>")?),
        "pause" => ConsoleCommand::Pause(guild(&mut words, "pause <guild>")?),
        "resume" => ConsoleCommand::Resume(guild(&mut words, "resume <guild>")?),
        "toggle" => ConsoleCommand::Toggle(guild(&mut words, "toggle <guild>")?),
        "stop" => ConsoleCommand::Stop(guild(&mut words, "stop <guild>")?),
        "loop" => ConsoleCommand::Loop(guild(&mut words, "loop <guild>")?),
        "queue" => ConsoleCommand::Queue(guild(&mut words, "queue <guild>")?),
        "voice" => {
            const USAGE: &str = "voice <guild> <session_id> <token> <endpoint>";
            let guild_id = guild(&mut words, USAGE)?;
            let mut next = || words.next().map(str::to_string).ok_or(ParseError::Usage(USAGE));
            let state = VoiceState {
                session_id: next()?,
                token: next()?,
                endpoint: next()?,
                channel_id: None,
            };
            ConsoleCommand::Voice { guild_id, state }
        }
        "help" => ConsoleCommand::Help,
        "quit" | "exit" => ConsoleCommand::Quit,
        other => return Err(ParseError::Unknown(other.to_string())),
    };
    Ok(Some(command))
}

/// Line-oriented stand-in for a chat command surface.
pub struct Console {
    commands: Arc<Commands>,
    operator: UserId,
    voice: Arc<VoiceRelay>,
    requests: flume::Receiver<VoiceRequest>,
    cancel: CancellationToken,
}

impl Console {
    /// `operator` is credited for plays that do not name a requester.
    pub fn new(
        commands: Commands,
        operator: UserId,
        voice: Arc<VoiceRelay>,
        requests: flume::Receiver<VoiceRequest>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            commands: Arc::new(commands),
            operator,
            voice,
            requests,
            cancel,
        }
    }

    /// Read commands until `quit`, end of input, or cancellation.
    pub async fn run(self) {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        println!("Type 'help' for commands.");

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                Ok(request) = self.requests.recv_async() => log_request(&request),
                line = lines.next_line() => match line {
                    Ok(Some(line)) => match parse(&line) {
                        Ok(Some(ConsoleCommand::Quit)) => break,
                        Ok(Some(command)) => self.submit(command),
                        Ok(None) => {}
                        Err(e) => println!("{}", e),
                    },
                    Ok(None) => {
                        info!("Console input closed");
                        break;
                    }
                    Err(e) => {
                        warn!("Console read failed: {}", e);
                        break;
                    }
                }
            }
        }
    }

    /// Commands that wait on voice would otherwise block the `voice` line
    /// that unblocks them, so each runs on its own task.
    fn submit(&self, command: ConsoleCommand) {
        match command {
            ConsoleCommand::Help => println!("{}", HELP),
            ConsoleCommand::Voice { guild_id, state } => {
                if !self.voice.provide(&guild_id, state) {
                    println!("[{}] no voice join is pending", guild_id);
                }
            }
            command => {
                tokio::spawn(execute(self.commands.clone(), self.operator, command));
            }
        }
    }
}

async fn execute(commands: Arc<Commands>, operator: UserId, command: ConsoleCommand) {
    let reply = match command {
        ConsoleCommand::Play {
            guild_id,
            channel_id,
            requester,
            query,
        } => commands
            .handle_play(
                &guild_id,
                channel_id,
                requester.unwrap_or(operator),
                &query,
            )
            .await
            .map(|outcome| match outcome {
                PlayOutcome::Started(track) => format!("[{}] Now playing {}", guild_id, track),
                PlayOutcome::Queued { track, position } => {
                    format!("[{}] Queued {} at position {}", guild_id, track, position)
                }
                PlayOutcome::QueuedPlaylist { count } => {
                    format!("[{}] Queued {} tracks", guild_id, count)
                }
            }),
        ConsoleCommand::Search(query) => {
            commands
                .handle_search(&query)
                .await
                .map(|candidates| {
                    if candidates.is_empty() {
                        return format!("No candidates for {:?}", query);
                    }
                    candidates
                        .iter()
                        .enumerate()
                        .map(|(index, track)| format!("  {}. {}", index + 1, track))
                        .collect::<Vec<_>>()
                        .join("\n")
                })
        }
        ConsoleCommand::Skip(guild_id) => commands.handle_skip(&guild_id).await.map(|skipped| {
            match skipped {
                Some(track) => format!("[{}] Skipped {}", guild_id, track),
                None => format!("[{}] Skipped", guild_id),
            }
        }),
        ConsoleCommand::Pause(guild_id) => commands
            .handle_pause(&guild_id)
            .await
            .map(|state| describe_state(&guild_id, state)),
        ConsoleCommand::Resume(guild_id) => commands
            .handle_resume(&guild_id)
            .await
            .map(|state| describe_state(&guild_id, state)),
        ConsoleCommand::Toggle(guild_id) => commands
            .handle_pause_toggle(&guild_id)
            .await
            .map(|state| describe_state(&guild_id, state)),
        ConsoleCommand::Stop(guild_id) => commands
            .handle_stop(&guild_id)
            .await
            .map(|()| format!("[{}] Stopped", guild_id)),
        ConsoleCommand::Loop(guild_id) => commands.handle_loop_toggle(&guild_id).await.map(|on| {
            format!("[{}] Loop {}", guild_id, if on { "on" } else { "off" })
        }),
        ConsoleCommand::Queue(guild_id) => commands.handle_queue(&guild_id).await.map(|snapshot| {
            let mut reply = match &snapshot.current {
                Some(track) => format!("[{}] Now playing {}", guild_id, track),
                None => format!("[{}] Nothing playing", guild_id),
            };
            for (index, track) in snapshot.queue.iter().enumerate() {
                reply.push_str(&format!("\n  {}. {}", index + 1, track));
            }
            reply
        }),
        ConsoleCommand::Voice { .. } | ConsoleCommand::Help | ConsoleCommand::Quit => return,
    };

    match reply {
        Ok(reply) => println!("{}", reply),
        Err(e) => println!("Error: {}", e),
    }
}

fn describe_state(guild_id: &GuildId, state: PlaybackState) -> String {
    match state {
        PlaybackState::Paused => format!("[{}] Paused", guild_id),
        _ => format!("[{}] Playing", guild_id),
    }
}

fn log_request(request: &VoiceRequest) {
    match request {
        VoiceRequest::Join {
            guild_id,
            channel_id,
        } => info!(
            "[{}] join voice channel {} and answer with 'voice {} <session_id> <token> <endpoint>'",
            guild_id, channel_id, guild_id
        ),
        VoiceRequest::Leave { guild_id } => info!("[{}] leave voice", guild_id),
    }
}
