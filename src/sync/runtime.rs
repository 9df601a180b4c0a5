//! Single-task driver for [`ChatSync`]: one command queue owns the engine,
//! subscription receivers are forwarded into it tagged with the generation
//! current at subscribe time, and hydration tickets come back through the
//! queue after their debounce sleep. No locks; the queue is the only writer.

use futures::StreamExt;
use tokio::sync::{mpsc, oneshot};
use tokio_stream::wrappers::ReceiverStream;
use uuid::Uuid;

use crate::channels::Channel;
use crate::error::AppError;
use crate::events::ChangeEvent;
use crate::sync::engine::{ChatSync, HydrationTicket, HYDRATION_DEBOUNCE};

pub enum Command {
    Select {
        channel: Option<Channel>,
        reply: oneshot::Sender<Result<(), AppError>>,
    },
    Refresh {
        reply: oneshot::Sender<Result<(), AppError>>,
    },
    SendText {
        body: String,
        thread_id: Option<Uuid>,
        reply_to: Option<Uuid>,
        reply: oneshot::Sender<Result<Uuid, AppError>>,
    },
    ToggleReaction {
        message_id: Uuid,
        emoji: String,
        reply: oneshot::Sender<Result<(), AppError>>,
    },
    DeleteMessage {
        message_id: Uuid,
        reply: oneshot::Sender<Result<(), AppError>>,
    },
    Event {
        generation: u64,
        event: ChangeEvent,
    },
    Hydrate(HydrationTicket),
    Inspect(Box<dyn FnOnce(&ChatSync) + Send>),
    Shutdown,
}

#[derive(Clone)]
pub struct SyncHandle {
    commands: mpsc::Sender<Command>,
}

impl SyncHandle {
    pub async fn select_channel(&self, channel: Option<Channel>) -> Result<(), AppError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Select { channel, reply: tx }).await?;
        rx.await.unwrap_or_else(|_| Err(unexpected!("sync engine stopped")))
    }

    pub async fn refresh(&self) -> Result<(), AppError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Refresh { reply: tx }).await?;
        rx.await.unwrap_or_else(|_| Err(unexpected!("sync engine stopped")))
    }

    pub async fn send_text(&self, body: String, thread_id: Option<Uuid>, reply_to: Option<Uuid>) -> Result<Uuid, AppError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::SendText {
            body,
            thread_id,
            reply_to,
            reply: tx,
        })
        .await?;
        rx.await.unwrap_or_else(|_| Err(unexpected!("sync engine stopped")))
    }

    pub async fn toggle_reaction(&self, message_id: Uuid, emoji: String) -> Result<(), AppError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::ToggleReaction {
            message_id,
            emoji,
            reply: tx,
        })
        .await?;
        rx.await.unwrap_or_else(|_| Err(unexpected!("sync engine stopped")))
    }

    pub async fn delete_message(&self, message_id: Uuid) -> Result<(), AppError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::DeleteMessage { message_id, reply: tx }).await?;
        rx.await.unwrap_or_else(|_| Err(unexpected!("sync engine stopped")))
    }

    /// Run a closure against the engine on its own task and get the result
    /// back; the read is serialized with every mutation.
    pub async fn with<F, R>(&self, f: F) -> Result<R, AppError>
    where
        F: FnOnce(&ChatSync) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Inspect(Box::new(move |engine| {
            tx.send(f(engine)).ok();
        })))
        .await?;
        rx.await.map_err(|_| unexpected!("sync engine stopped"))
    }

    pub async fn shutdown(&self) {
        self.commands.send(Command::Shutdown).await.ok();
    }

    async fn send(&self, command: Command) -> Result<(), AppError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| unexpected!("sync engine stopped"))
    }
}

pub fn spawn(engine: ChatSync) -> SyncHandle {
    let (tx, rx) = mpsc::channel(64);
    let handle = SyncHandle { commands: tx.clone() };
    tokio::spawn(run(engine, tx, rx));
    handle
}

async fn run(mut engine: ChatSync, commands_tx: mpsc::Sender<Command>, mut commands: mpsc::Receiver<Command>) {
    match engine.subscribe_city_events().await {
        Ok(receiver) => forward_events(receiver, commands_tx.clone(), engine.generation()),
        Err(e) => log::warn!("City events subscription failed: {}", e),
    }
    while let Some(command) = commands.recv().await {
        match command {
            Command::Select { channel, reply } => {
                let result = match engine.select_channel(channel).await {
                    Ok(Some(receiver)) => {
                        forward_events(receiver, commands_tx.clone(), engine.generation());
                        Ok(())
                    }
                    Ok(None) => Ok(()),
                    Err(e) => Err(e),
                };
                reply.send(result).ok();
            }
            Command::Refresh { reply } => {
                reply.send(engine.refresh().await).ok();
            }
            Command::SendText {
                body,
                thread_id,
                reply_to,
                reply,
            } => {
                reply.send(engine.send_text(&body, thread_id, reply_to).await).ok();
            }
            Command::ToggleReaction {
                message_id,
                emoji,
                reply,
            } => {
                reply.send(engine.toggle_reaction(message_id, &emoji).await).ok();
            }
            Command::DeleteMessage { message_id, reply } => {
                reply.send(engine.delete_message(message_id).await).ok();
            }
            Command::Event { generation, event } => {
                for ticket in engine.handle_event(generation, event).await {
                    let commands_tx = commands_tx.clone();
                    tokio::spawn(async move {
                        tokio::time::sleep(HYDRATION_DEBOUNCE).await;
                        commands_tx.send(Command::Hydrate(ticket)).await.ok();
                    });
                }
            }
            Command::Hydrate(ticket) => engine.hydrate(ticket).await,
            Command::Inspect(inspect) => inspect(&engine),
            Command::Shutdown => break,
        }
    }
}

fn forward_events(receiver: mpsc::Receiver<ChangeEvent>, commands: mpsc::Sender<Command>, generation: u64) {
    tokio::spawn(async move {
        let mut stream = ReceiverStream::new(receiver);
        while let Some(event) = stream.next().await {
            if commands.send(Command::Event { generation, event }).await.is_err() {
                break;
            }
        }
    });
}
