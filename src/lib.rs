pub mod api;
pub mod cli;
pub mod console;
pub mod models;
pub mod render;
pub mod transport;
pub mod view;
pub mod widget;

use cli::Args;
use log::info;
use std::error::Error;
use tokio::io::BufReader;
use transport::{ event_channel, new_transport };
use view::terminal::TerminalView;
use widget::ChatWidget;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    let transport_config = args.transport_config()?;

    info!("--- Chat Configuration ---");
    info!("Base URL: {}", args.base_url);
    info!("Request ID: {}", args.request_id);
    info!("Partner: {}", args.partner_name);
    info!("Transport: {}", transport_config.transport_type);
    info!("Poll Interval: {:?}", transport_config.poll_interval);
    if let Some(ws_url) = &transport_config.ws_url {
        info!("WebSocket URL: {}", ws_url);
    }
    info!("Session Cookie: {}", if args.session_cookie.is_some() { "set" } else { "not set" });
    info!("-------------------------");

    let api = api::new_client(&args.api_config())?;

    if args.count {
        let count = api.message_count(&args.request_id).await?;
        println!("{}", count);
        return Ok(());
    }

    let transport = new_transport(&transport_config, api)?;
    let (events_tx, mut events_rx) = event_channel();
    let mut widget = ChatWidget::new(transport, TerminalView::stdout(), events_tx);

    widget.open(&args.request_id, &args.partner_name).await;
    if !widget.is_open() {
        return Err(format!("Could not open chat for request {}", args.request_id).into());
    }

    let stdin = BufReader::new(tokio::io::stdin());
    console::drive(&mut widget, &mut events_rx, stdin).await?;

    Ok(())
}
