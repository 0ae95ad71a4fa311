use std::sync::Once;

use knowledge_relay::{
    config::Config,
    platform::{AssistantPlatform, OpenAiClient},
    relay,
};

static INIT: Once = Once::new();

fn live_config() -> Config {
    INIT.call_once(|| {
        dotenvy::dotenv().ok();
    });
    Config::from_env()
        .expect("OPENAI_API_KEY, OPENAI_VECTOR_STORE_ID and KNOWLEDGE_AGENT_ID must be set")
}

#[tokio::test]
#[ignore = "Requires live assistant platform credentials"]
async fn live_agent_answers_question() {
    let config = live_config();
    let client = OpenAiClient::new(&config).expect("client");
    let reply = relay::relay_question(&client, &config, "What documents do you know about?")
        .await
        .expect("agent reply");
    assert!(!reply.trim().is_empty(), "agent reply should not be empty");
}

#[tokio::test]
#[ignore = "Requires live assistant platform credentials"]
async fn live_thread_roundtrip() {
    let config = live_config();
    let client = OpenAiClient::new(&config).expect("client");
    let thread = client.create_thread().await.expect("thread");
    client
        .create_message(&thread.id, "ping")
        .await
        .expect("message");
    let messages = client.list_messages(&thread.id).await.expect("messages");
    assert_eq!(messages.len(), 1, "only the user message should exist");
    assert_eq!(messages[0].first_text(), Some("ping"));
}
