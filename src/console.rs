use log::{ info, warn };
use std::error::Error;
use tokio::io::{ AsyncBufRead, AsyncBufReadExt };

use crate::transport::EventReceiver;
use crate::view::ChatView;
use crate::widget::ChatWidget;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Send(String),
    Retry,
    Reload,
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Option<Command> {
        let trimmed = line.trim();
        match trimmed {
            "" => None,
            "/quit" | "/exit" => Some(Command::Quit),
            "/retry" => Some(Command::Retry),
            "/reload" => Some(Command::Reload),
            _ => Some(Command::Send(line.to_string())),
        }
    }
}

/// Drives an open widget from input lines and transport events until the
/// conversation closes, input ends, or Ctrl-C arrives.
pub async fn drive<V, R>(
    widget: &mut ChatWidget<V>,
    events: &mut EventReceiver,
    input: R
) -> Result<(), Box<dyn Error + Send + Sync>>
    where V: ChatView, R: AsyncBufRead + Unpin
{
    let mut lines = input.lines();

    while widget.is_open() {
        tokio::select! {
            line = lines.next_line() => {
                match line? {
                    Some(line) => {
                        match Command::parse(&line) {
                            Some(Command::Send(text)) => {
                                widget.view_mut().set_draft(&text);
                                widget.send(&text).await;
                            }
                            Some(Command::Retry) => {
                                let draft = widget.view().draft();
                                widget.send(&draft).await;
                            }
                            Some(Command::Reload) => widget.load_history().await,
                            Some(Command::Quit) => widget.close(),
                            None => widget.view_mut().focus_input(),
                        }
                    }
                    None => {
                        info!("Input closed");
                        widget.close();
                    }
                }
            }
            event = events.recv() => {
                match event {
                    Some(event) => widget.handle_event(event).await,
                    None => {
                        warn!("Event channel closed");
                        widget.close();
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                widget.close();
            }
        }
    }

    Ok(())
}
