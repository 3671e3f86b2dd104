use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tunelink::{
    backend::{LavalinkNode, VoiceRelay},
    common::{
        banner::{BannerInfo, print_banner},
        logger,
        types::AnyResult,
    },
    configs::Config,
    console::Console,
    dashboard::{EmbedRenderer, LogSink},
    player::SessionRegistry,
    server::{Commands, dispatcher},
};

#[tokio::main]
async fn main() -> AnyResult<()> {
    let config = Config::load()?;
    print_banner(&BannerInfo::default(), &config);
    logger::init(config.logging.as_ref());

    let (voice, voice_requests) = VoiceRelay::new(config.player.voice_timeout());
    let (node, events) = LavalinkNode::new(config.lavalink.clone(), voice.clone())?;
    info!("Using Lavalink node at {}", config.lavalink.rest_base());

    let cancel = CancellationToken::new();
    let link = tokio::spawn({
        let node = node.clone();
        async move {
            if let Err(e) = node.run().await {
                error!("Node link gave up: {}", e);
            }
        }
    });

    let registry = SessionRegistry::new(
        node.clone(),
        Arc::new(EmbedRenderer),
        Arc::new(LogSink),
        config.player.clone(),
    );
    tokio::spawn(dispatcher::run(registry.clone(), events, cancel.clone()));

    let commands = Commands::new(
        registry.clone(),
        node.clone(),
        Arc::new(EmbedRenderer),
        Arc::new(LogSink),
    );
    let console = Console::new(
        commands,
        config.lavalink.user_id,
        voice,
        voice_requests,
        cancel.clone(),
    );

    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("Received Ctrl-C, shutting down"),
        _ = console.run() => info!("Console closed, shutting down"),
    }

    registry.shutdown().await;
    node.shutdown();
    cancel.cancel();
    let _ = link.await;

    info!("Goodbye");
    Ok(())
}
