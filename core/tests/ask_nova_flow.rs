//! End-to-end Ask-Nova flow: a selected hierarchy row is scoped, the
//! context re-query runs, and the composed prompt lands in the chat
//! transcript as a user message followed by the streamed reply.

use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use futures::stream;
use pretty_assertions::assert_eq;
use tokio_util::sync::CancellationToken;

use finsight_assistant::CompletionItem;
use finsight_assistant::CompletionStream;
use finsight_assistant::StreamEnd;
use finsight_backend_client::ApiError;
use finsight_backend_client::PnlQuery;
use finsight_core::ChatPhase;
use finsight_core::ChatSession;
use finsight_core::CompletionTransport;
use finsight_core::HierarchyProvider;
use finsight_core::NovaAssembler;
use finsight_protocol::ChatRole;
use finsight_protocol::ClusterNode;
use finsight_protocol::FilterState;
use finsight_protocol::HierarchyMode;
use finsight_protocol::HierarchyRow;

struct ScopedHierarchy {
    queries: Mutex<Vec<(HierarchyMode, PnlQuery)>>,
}

#[async_trait]
impl HierarchyProvider for ScopedHierarchy {
    async fn hierarchy_rows(
        &self,
        mode: HierarchyMode,
        query: &PnlQuery,
    ) -> Result<Vec<HierarchyRow>, ApiError> {
        self.queries
            .lock()
            .expect("queries")
            .push((mode, query.clone()));
        let node: ClusterNode = serde_json::from_value(serde_json::json!({
            "clusterId": "CL1",
            "clusterName": "EMEA",
            "revenue": 1200.0,
            "cost": 700.0,
            "grossProfit": 500.0,
            "margin": 41.7,
            "accountCount": 3
        }))
        .expect("cluster node");
        Ok(vec![HierarchyRow::Cluster(node)])
    }
}

/// Echoes a canned analysis regardless of the inquiry, but records it.
struct EchoTransport {
    inquiries: Mutex<Vec<String>>,
}

impl CompletionTransport for EchoTransport {
    fn stream(&self, inquiry: &str, _cancel: CancellationToken) -> CompletionStream {
        self.inquiries
            .lock()
            .expect("inquiries")
            .push(inquiry.to_string());
        Box::pin(stream::iter(vec![
            CompletionItem::Fragment("EMEA revenue is trending up.".to_string()),
            CompletionItem::End(StreamEnd::Completed),
        ]))
    }
}

#[tokio::test(start_paused = true)]
async fn ask_nova_injects_the_scoped_prompt() {
    let provider = Arc::new(ScopedHierarchy {
        queries: Mutex::new(Vec::new()),
    });
    let transport = Arc::new(EchoTransport {
        inquiries: Mutex::new(Vec::new()),
    });
    let assembler = NovaAssembler::new(provider.clone());
    let mut chat = ChatSession::new(transport.clone());

    let row = HierarchyRow::Cluster(
        serde_json::from_str::<ClusterNode>(r#"{"id": "CL1", "clusterName": "EMEA"}"#)
            .expect("cluster node"),
    );
    assembler
        .dispatch(
            &mut chat,
            &FilterState::default(),
            HierarchyMode::Cluster,
            &row,
            "trend?",
        )
        .await;

    // The context re-query was scoped to exactly the selected cluster.
    let queries = provider.queries.lock().expect("queries");
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0].1.cluster_ids, vec!["CL1".to_string()]);

    // Greeting, injected prompt, streamed reply.
    let messages = chat.messages();
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[1].role, ChatRole::User);
    assert!(messages[1].content.contains("User Question: trend?"));
    assert!(messages[1].content.contains("Context Data (cluster level):"));
    assert!(messages[1].content.contains("\"clusterName\": \"EMEA\""));
    assert_eq!(messages[2].content, "EMEA revenue is trending up.");
    assert_eq!(chat.phase(), ChatPhase::Idle);

    // The transport saw the full composed prompt, not just the question.
    let inquiries = transport.inquiries.lock().expect("inquiries");
    assert!(inquiries[0].contains("```json"));
}
