//! Serving loop over an in-memory byte stream.

use nlp_plugin_core::message::{BindHandshake, Frame, encode_payload};
use nlp_plugin_core::{
    Action, BindExtras, ConsumerInfo, EditorContent, Message, SpellingResult, SuggestionRequest,
    SuggestionRequestFlags,
};
use nlp_plugin_service::{PluginService, ProviderHandlers, WordListProvider, serve};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, Lines};

async fn next_line(lines: &mut Lines<BufReader<DuplexStream>>) -> String {
    tokio::time::timeout(Duration::from_secs(1), lines.next_line())
        .await
        .expect("no line in time")
        .unwrap()
        .expect("stream closed")
}

fn spell_frame(id: i32, word: &str) -> String {
    let request = SuggestionRequest::from_content(
        0,
        &EditorContent::word(word),
        SuggestionRequestFlags::default(),
    );
    let message = Message::request_to_service(Action::Spell, id, Some(encode_payload(&request).unwrap()));
    format!("{}\n", message.to_frame().to_line().unwrap())
}

#[tokio::test]
async fn test_serve_handshake_and_replies() {
    let service = PluginService::start(ProviderHandlers::full(Arc::new(WordListProvider::new([
        "hello",
    ]))));
    let (host_out, provider_in) = tokio::io::duplex(4096);
    let (provider_out, host_in) = tokio::io::duplex(4096);

    let server = {
        let service = Arc::clone(&service);
        tokio::spawn(async move {
            serve(
                &service,
                &ConsumerInfo::default().to_extras(),
                provider_in,
                provider_out,
            )
            .await
        })
    };

    let mut host_out = host_out;
    let mut lines = BufReader::new(host_in).lines();
    let handshake: BindHandshake = serde_json::from_str(&next_line(&mut lines).await).unwrap();
    assert!(handshake.bound);

    host_out.write_all(b"not a frame\n").await.unwrap();
    host_out.write_all(spell_frame(11, "hello").as_bytes()).await.unwrap();

    let reply = Message::from_frame(Frame::from_line(&next_line(&mut lines).await).unwrap()).unwrap();
    assert!(reply.is_service_response());
    assert_eq!(reply.id, 11);
    assert_eq!(reply.decode_payload::<SpellingResult>().unwrap(), SpellingResult::valid_word());

    drop(host_out);
    server.await.unwrap().unwrap();
    assert_eq!(service.active_bindings(), 0);
}

#[tokio::test]
async fn test_serve_refuses_anonymous_consumer() {
    let service = PluginService::start(ProviderHandlers::full(Arc::new(WordListProvider::builtin())));
    let (_host_out, provider_in) = tokio::io::duplex(1024);
    let (provider_out, host_in) = tokio::io::duplex(1024);

    serve(&service, &BindExtras::new(), provider_in, provider_out)
        .await
        .unwrap();

    let mut lines = BufReader::new(host_in).lines();
    let handshake: BindHandshake = serde_json::from_str(&next_line(&mut lines).await).unwrap();
    assert!(!handshake.bound);
}
