use paceload_core::{IterSource, Row, ThrottledWriter, WriterConfig};
use paceload_http::{HttpSink, HttpSinkConfig};

#[tokio::test]
async fn test_writer_retries_unavailable_endpoint() {
    let mut server = mockito::Server::new_async().await;
    let unavailable = server
        .mock("PUT", "/movies/Alien")
        .with_status(503)
        .expect(3)
        .create_async()
        .await;
    let ok = server
        .mock("PUT", "/movies/Heat")
        .with_status(200)
        .expect(1)
        .create_async()
        .await;
    let rejected = server
        .mock("PUT", "/movies/Ronin")
        .with_status(422)
        .expect(1)
        .create_async()
        .await;

    let mut sink = HttpSink::new(HttpSinkConfig::new(format!("{}/movies", server.url()))).unwrap();
    let writer = ThrottledWriter::new(
        WriterConfig::default()
            .with_rate_limit(200.0)
            .with_max_attempts(3),
    );

    let source = IterSource::from_vec(vec![
        Row::new("title", "Alien"),
        Row::new("title", "Heat"),
        Row::new("title", "Ronin"),
    ]);
    let report = writer.run(source, &mut sink).await.unwrap();

    assert_eq!(report.attempted, 3);
    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failed, 2);
    assert_eq!(report.write_calls, 5);

    unavailable.assert_async().await;
    ok.assert_async().await;
    rejected.assert_async().await;
}
