//! Service Module Tests
//!
//! End-to-end tests over real sockets: every node is an axum server on an
//! ephemeral `127.0.0.1` port with its own `MemoryEngine`, and nodes talk to
//! each other through `HttpPeerClient`. A "down" node is a reserved port
//! nobody listens on.

#[cfg(test)]
mod tests {
    use crate::coordinator::{HttpPeerClient, ReplicaCoordinator};
    use crate::record::TimestampedRecord;
    use crate::service::protocol::StatusResponse;
    use crate::service::serve;
    use crate::storage::{MemoryEngine, StorageEngine};
    use crate::topology::{NodeId, Topology};
    use bytes::Bytes;
    use reqwest::StatusCode;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    // ============================================================
    // TEST CLUSTER
    // ============================================================

    struct TestNode {
        url: String,
        engine: Option<Arc<MemoryEngine>>,
        _shutdown: Option<oneshot::Sender<()>>,
    }

    impl TestNode {
        fn engine(&self) -> &MemoryEngine {
            self.engine.as_ref().expect("node is down")
        }
    }

    struct TestCluster {
        nodes: Vec<TestNode>,
        client: reqwest::Client,
    }

    async fn start_cluster(size: usize, down: &[usize]) -> TestCluster {
        start_cluster_with_limit(size, down, None).await
    }

    async fn start_cluster_with_limit(
        size: usize,
        down: &[usize],
        max_value_bytes: Option<usize>,
    ) -> TestCluster {
        let mut listeners = Vec::with_capacity(size);
        for _ in 0..size {
            listeners.push(TcpListener::bind("127.0.0.1:0").await.unwrap());
        }
        let ids: Vec<NodeId> = listeners
            .iter()
            .map(|l| NodeId::new(format!("http://{}", l.local_addr().unwrap())))
            .collect();

        let mut nodes = Vec::with_capacity(size);
        for (i, listener) in listeners.into_iter().enumerate() {
            let url = ids[i].to_string();
            if down.contains(&i) {
                drop(listener);
                nodes.push(TestNode {
                    url,
                    engine: None,
                    _shutdown: None,
                });
                continue;
            }

            let engine = Arc::new(MemoryEngine::new());
            let topology = Topology::new(ids.clone(), ids[i].clone()).unwrap();
            let peers = HttpPeerClient::new(Duration::from_millis(500)).unwrap();
            let coordinator = Arc::new(ReplicaCoordinator::new(
                topology,
                engine.clone() as Arc<dyn StorageEngine>,
                peers,
            ));

            let (tx, rx) = oneshot::channel::<()>();
            tokio::spawn(serve(listener, coordinator, max_value_bytes, async move {
                let _ = rx.await;
            }));

            nodes.push(TestNode {
                url,
                engine: Some(engine),
                _shutdown: Some(tx),
            });
        }

        TestCluster {
            nodes,
            client: reqwest::Client::builder().no_proxy().build().unwrap(),
        }
    }

    impl TestCluster {
        fn entity(
            &self,
            node: usize,
            method: reqwest::Method,
            id: &str,
        ) -> reqwest::RequestBuilder {
            self.client
                .request(method, format!("{}/entity", self.nodes[node].url))
                .query(&[("id", id)])
        }

        async fn put(&self, node: usize, id: &str, value: &str, replicas: &str) -> StatusCode {
            self.entity(node, reqwest::Method::PUT, id)
                .query(&[("replicas", replicas)])
                .body(value.to_string())
                .send()
                .await
                .unwrap()
                .status()
        }

        async fn get(&self, node: usize, id: &str, replicas: &str) -> (StatusCode, Bytes) {
            let response = self
                .entity(node, reqwest::Method::GET, id)
                .query(&[("replicas", replicas)])
                .send()
                .await
                .unwrap();
            let status = response.status();
            (status, response.bytes().await.unwrap())
        }

        async fn delete(&self, node: usize, id: &str, replicas: &str) -> StatusCode {
            self.entity(node, reqwest::Method::DELETE, id)
                .query(&[("replicas", replicas)])
                .send()
                .await
                .unwrap()
                .status()
        }

        async fn list(&self, node: usize, query: &[(&str, &str)]) -> (StatusCode, String) {
            let response = self
                .client
                .get(format!("{}/entities", self.nodes[node].url))
                .query(query)
                .send()
                .await
                .unwrap();
            let status = response.status();
            (status, response.text().await.unwrap())
        }
    }

    /// Lets straggling replica writes land before the next step.
    async fn settle() {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    // ============================================================
    // BASIC ENDPOINTS
    // ============================================================

    #[tokio::test]
    async fn test_status_reports_node() {
        let cluster = start_cluster(1, &[]).await;

        let response = cluster
            .client
            .get(format!("{}/status", cluster.nodes[0].url))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let raw = response.bytes().await.unwrap();
        let body: StatusResponse = serde_json::from_slice(&raw).unwrap();
        assert_eq!(body.node, cluster.nodes[0].url);
        assert_eq!(body.cluster, vec![cluster.nodes[0].url.clone()]);
    }

    #[tokio::test]
    async fn test_unknown_path_is_bad_request() {
        let cluster = start_cluster(1, &[]).await;

        for path in ["/", "/v0/entity", "/nope"] {
            let status = cluster
                .client
                .get(format!("{}{}", cluster.nodes[0].url, path))
                .send()
                .await
                .unwrap()
                .status();
            assert_eq!(status, StatusCode::BAD_REQUEST, "path {}", path);
        }
    }

    // ============================================================
    // REQUEST VALIDATION
    // ============================================================

    #[tokio::test]
    async fn test_missing_or_empty_id_is_bad_request() {
        let cluster = start_cluster(1, &[]).await;
        let url = format!("{}/entity", cluster.nodes[0].url);

        let status = cluster.client.get(&url).send().await.unwrap().status();
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let status = cluster
            .client
            .get(&url)
            .query(&[("id", "")])
            .send()
            .await
            .unwrap()
            .status();
        assert_eq!(status, StatusCode::BAD_REQUEST);

        // The id is checked before the method.
        let status = cluster.client.post(&url).send().await.unwrap().status();
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unsupported_method_is_rejected() {
        let cluster = start_cluster(1, &[]).await;

        let status = cluster
            .entity(0, reqwest::Method::POST, "k")
            .send()
            .await
            .unwrap()
            .status();
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_invalid_replicas_are_bad_requests() {
        let cluster = start_cluster(3, &[]).await;

        for replicas in ["abc", "2", "0/3", "3/2", "2/4"] {
            let status = cluster.put(0, "k", "v", replicas).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "replicas={}", replicas);
        }

        // Nothing was dispatched.
        for node in &cluster.nodes {
            assert!(node.engine().is_empty());
        }
    }

    // ============================================================
    // QUORUM SCENARIOS
    // ============================================================

    #[tokio::test]
    async fn test_put_get_delete_across_nodes() {
        let cluster = start_cluster(3, &[]).await;

        assert_eq!(cluster.put(0, "a", "1", "2/3").await, StatusCode::CREATED);
        settle().await;

        let (status, body) = cluster.get(1, "a", "2/3").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, Bytes::from_static(b"1"));

        assert_eq!(cluster.delete(2, "a", "2/3").await, StatusCode::ACCEPTED);
        settle().await;

        for node in 0..3 {
            let (status, _) = cluster.get(node, "a", "2/3").await;
            assert_eq!(status, StatusCode::NOT_FOUND);
        }
    }

    #[tokio::test]
    async fn test_overwrite_returns_latest_value() {
        let cluster = start_cluster(3, &[]).await;

        assert_eq!(cluster.put(0, "k", "first", "3/3").await, StatusCode::CREATED);
        settle().await;
        assert_eq!(cluster.put(1, "k", "second", "3/3").await, StatusCode::CREATED);

        let (status, body) = cluster.get(2, "k", "1/3").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, Bytes::from_static(b"second"));
    }

    #[tokio::test]
    async fn test_default_replicas_is_majority() {
        let cluster = start_cluster(3, &[2]).await;

        let status = cluster
            .entity(0, reqwest::Method::PUT, "k")
            .body("v")
            .send()
            .await
            .unwrap()
            .status();
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = cluster.get(1, "k", "2/3").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, Bytes::from_static(b"v"));
    }

    #[tokio::test]
    async fn test_never_written_key_is_not_found() {
        let cluster = start_cluster(3, &[]).await;

        let (status, _) = cluster.get(0, "ghost", "3/3").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_empty_value_round_trips() {
        let cluster = start_cluster(3, &[]).await;

        assert_eq!(cluster.put(0, "e", "", "3/3").await, StatusCode::CREATED);

        let (status, body) = cluster.get(1, "e", "3/3").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_node_down_fails_full_quorum_only() {
        let cluster = start_cluster(3, &[2]).await;

        assert_eq!(cluster.put(0, "a", "1", "3/3").await, StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(cluster.delete(1, "a", "3/3").await, StatusCode::GATEWAY_TIMEOUT);
        let (status, _) = cluster.get(0, "a", "3/3").await;
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);

        assert_eq!(cluster.put(0, "b", "2", "2/3").await, StatusCode::CREATED);
        let (status, body) = cluster.get(1, "b", "2/3").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, Bytes::from_static(b"2"));
    }

    #[tokio::test]
    async fn test_failed_quorum_write_is_not_rolled_back() {
        let cluster = start_cluster(3, &[2]).await;

        assert_eq!(cluster.put(0, "kept", "v", "3/3").await, StatusCode::GATEWAY_TIMEOUT);

        for node in &cluster.nodes[..2] {
            let raw = node.engine().get(b"kept").unwrap().expect("write stays on replica");
            let record = TimestampedRecord::decode(&raw).unwrap();
            assert_eq!(record.payload(), Some(&Bytes::from_static(b"v")));
        }
    }

    // ============================================================
    // VALUE SIZE
    // ============================================================

    fn large_value() -> String {
        // 3 MiB, above axum's built-in body limit.
        "x".repeat(3 * 1024 * 1024)
    }

    #[tokio::test]
    async fn test_large_value_replicates_through_quorum() {
        let cluster = start_cluster(3, &[]).await;
        let value = large_value();

        assert_eq!(cluster.put(0, "big", &value, "2/3").await, StatusCode::CREATED);

        let (status, body) = cluster.get(1, "big", "2/3").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.len(), value.len());
        assert_eq!(body, Bytes::from(value));
    }

    #[tokio::test]
    async fn test_large_value_on_standalone_node() {
        let cluster = start_cluster(1, &[]).await;
        let value = large_value();

        assert_eq!(cluster.put(0, "big", &value, "1/1").await, StatusCode::CREATED);

        let (status, body) = cluster.get(0, "big", "1/1").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, Bytes::from(value));
    }

    #[tokio::test]
    async fn test_configured_value_limit_rejects_larger_bodies() {
        let cluster = start_cluster_with_limit(1, &[], Some(16)).await;

        assert_eq!(cluster.put(0, "small", "fits", "1/1").await, StatusCode::CREATED);
        assert_eq!(
            cluster.put(0, "big", &"x".repeat(17), "1/1").await,
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert!(cluster.nodes[0].engine().get(b"big").unwrap().is_none());
    }

    // ============================================================
    // PROXIED REQUESTS
    // ============================================================

    #[tokio::test]
    async fn test_proxied_requests_return_encoded_records() {
        let cluster = start_cluster(3, &[]).await;
        let proxied = |method| {
            cluster
                .entity(1, method, "p")
                .query(&[("proxied", "true")])
        };

        let response = proxied(reqwest::Method::GET).send().await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let record = TimestampedRecord::decode(&response.bytes().await.unwrap()).unwrap();
        assert_eq!(record, TimestampedRecord::absent());

        let response = proxied(reqwest::Method::PUT).body("v").send().await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let written = TimestampedRecord::decode(&response.bytes().await.unwrap()).unwrap();
        assert_eq!(written.payload(), Some(&Bytes::from_static(b"v")));
        assert!(written.timestamp() > 0);

        let response = proxied(reqwest::Method::GET).send().await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let read = TimestampedRecord::decode(&response.bytes().await.unwrap()).unwrap();
        assert_eq!(read, written);

        let response = proxied(reqwest::Method::DELETE).send().await.unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let tombstone = TimestampedRecord::decode(&response.bytes().await.unwrap()).unwrap();
        assert!(tombstone.is_tombstone());

        // Only the receiving node was touched.
        assert!(cluster.nodes[0].engine().is_empty());
        assert!(cluster.nodes[2].engine().is_empty());
        assert_eq!(cluster.nodes[1].engine().len(), 1);
    }

    // ============================================================
    // STANDALONE NODE
    // ============================================================

    #[tokio::test]
    async fn test_standalone_round_trip_and_physical_delete() {
        let cluster = start_cluster(1, &[]).await;

        assert_eq!(cluster.put(0, "k", "v", "1/1").await, StatusCode::CREATED);
        let (status, body) = cluster.get(0, "k", "1/1").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, Bytes::from_static(b"v"));

        assert_eq!(cluster.delete(0, "k", "1/1").await, StatusCode::ACCEPTED);
        assert!(cluster.nodes[0].engine().is_empty());

        let (status, _) = cluster.get(0, "k", "1/1").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    // ============================================================
    // RANGE LISTING
    // ============================================================

    #[tokio::test]
    async fn test_entities_lists_live_records_in_order() {
        let cluster = start_cluster(1, &[]).await;
        for (id, value) in [("c", "3"), ("a", "1"), ("b", "2"), ("d", ""), ("e", "5")] {
            assert_eq!(cluster.put(0, id, value, "1/1").await, StatusCode::CREATED);
        }
        let engine = cluster.nodes[0].engine();
        engine.put(b"b", &TimestampedRecord::tombstone(1).encode()).unwrap();
        engine.put(b"bb", b"garbage").unwrap();

        let (status, body) = cluster.list(0, &[("start", "a"), ("end", "e")]).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "a\n1\nc\n3\nd\n\n");

        let (status, body) = cluster.list(0, &[("start", "c")]).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "c\n3\nd\n\ne\n5\n");

        let (_, body) = cluster.list(0, &[("start", "c"), ("end", "")]).await;
        assert_eq!(body, "c\n3\nd\n\ne\n5\n");

        let (_, body) = cluster.list(0, &[("start", "x")]).await;
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_entities_validates_request() {
        let cluster = start_cluster(1, &[]).await;

        let (status, _) = cluster.list(0, &[]).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = cluster.list(0, &[("start", "")]).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let status = cluster
            .client
            .put(format!("{}/entities", cluster.nodes[0].url))
            .query(&[("start", "a")])
            .send()
            .await
            .unwrap()
            .status();
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_entities_is_local_only() {
        let cluster = start_cluster(3, &[]).await;
        assert_eq!(cluster.put(0, "k", "v", "3/3").await, StatusCode::CREATED);
        cluster.nodes[1]
            .engine()
            .put(b"only-here", &TimestampedRecord::value(Bytes::from_static(b"x"), 1).encode())
            .unwrap();

        let (_, body) = cluster.list(0, &[("start", "a")]).await;
        assert_eq!(body, "k\nv\n");

        let (_, body) = cluster.list(1, &[("start", "a")]).await;
        assert_eq!(body, "k\nv\nonly-here\nx\n");
    }
}
