//! Background requests. Each task runs one service call on the runtime and
//! reports the outcome back to the event loop, tagged with the session epoch
//! it was started under.

use feedchat_core::{
    AuthError, ChatError, ChatRequest, ChatService, ChatTicket, FeedItem, FeedService, FeedTicket,
    FetchError, PostRequest, SubmitError,
};
use tokio::sync::mpsc::UnboundedSender;

use crate::tui::AppEvent;

#[derive(Debug)]
pub enum Completion {
    Login {
        epoch: u64,
        username: String,
        result: Result<String, AuthError>,
    },
    Feed {
        epoch: u64,
        ticket: FeedTicket,
        result: Result<Vec<FeedItem>, FetchError>,
    },
    Post {
        epoch: u64,
        request: PostRequest,
        result: Result<(), SubmitError>,
    },
    Chat {
        epoch: u64,
        ticket: ChatTicket,
        result: Result<String, ChatError>,
    },
}

fn report(tx: &UnboundedSender<AppEvent>, completion: Completion) {
    // The receiver only goes away when the app is shutting down.
    let _ = tx.send(AppEvent::Completed(completion));
}

pub fn spawn_login(
    tx: UnboundedSender<AppEvent>,
    service: FeedService,
    epoch: u64,
    username: String,
    password: String,
) {
    tokio::spawn(async move {
        let result = service.request_token(&username, &password).await;
        report(&tx, Completion::Login { epoch, username, result });
    });
}

pub fn spawn_feed_load(tx: UnboundedSender<AppEvent>, service: FeedService, epoch: u64, ticket: FeedTicket) {
    tokio::spawn(async move {
        let result = service.fetch_feed().await;
        report(&tx, Completion::Feed { epoch, ticket, result });
    });
}

pub fn spawn_post(tx: UnboundedSender<AppEvent>, service: FeedService, epoch: u64, request: PostRequest) {
    tokio::spawn(async move {
        let result = service
            .create_post(&request.caption, request.image.as_ref())
            .await;
        report(&tx, Completion::Post { epoch, request, result });
    });
}

pub fn spawn_chat(tx: UnboundedSender<AppEvent>, service: ChatService, epoch: u64, request: ChatRequest) {
    tokio::spawn(async move {
        let result = service
            .send_message(&request.message, &request.username)
            .await;
        report(
            &tx,
            Completion::Chat {
                epoch,
                ticket: request.ticket,
                result,
            },
        );
    });
}
