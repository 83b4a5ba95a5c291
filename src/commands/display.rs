use crate::db::Store;
use crate::models::SessionId;
use crate::tasks::live_view::{Frame, LiveView};
use crate::voting::gauge;
use clap::Args;
use log::{info, warn};
use std::sync::Arc;

#[derive(Debug, Args)]
pub struct DisplayArgs {
    /// Poll session to show
    pub session: String,

    /// Print the current result once and exit
    #[arg(long)]
    pub once: bool,

    /// One JSON object per update instead of text
    #[arg(long)]
    pub json: bool,
}

pub fn format_frame(frame: &Frame, json: bool) -> String {
    if json {
        match serde_json::to_string(frame) {
            Ok(line) => line,
            Err(e) => {
                warn!("Failed to serialize frame: {}", e);
                String::new()
            }
        }
    } else {
        gauge::render(frame.session.as_str(), &frame.stats, &frame.gauge)
    }
}

pub async fn handle_display(
    store: Arc<dyn Store>,
    args: DisplayArgs,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let session = SessionId::parse(&args.session)?;
    let mut view = match LiveView::attach(store.as_ref(), &session).await {
        Ok(view) => view,
        Err(e) => {
            eprintln!("Could not connect to the vote store. Please try again.");
            return Err(e.into());
        }
    };

    if args.once {
        if let Some(frame) = view.next_frame().await {
            println!("{}", format_frame(&frame, args.json));
        }
        view.close();
        return Ok(());
    }

    let json = args.json;
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Could not listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };
    let rendered = view
        .run(shutdown, |frame| println!("{}", format_frame(frame, json)))
        .await;
    info!("Display of session {} ended after {} update(s)", session, rendered);

    Ok(())
}
