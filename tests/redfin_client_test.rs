use anyhow::Result;
use listing_scraper::apis::RedfinSearchClient;
use listing_scraper::config::{FetchConfig, SearchDef};
use listing_scraper::error::ScraperError;
use listing_scraper::types::ListingSource;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Answers a single request with `status` and `body`, returns the base URL.
async fn serve_once(status: &'static str, body: String) -> Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Ok((mut socket, _)) = listener.accept().await {
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                match socket.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => request.extend_from_slice(&buf[..n]),
                }
            }
            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
    });

    Ok(format!("http://{addr}"))
}

fn search(base: &str) -> SearchDef {
    SearchDef {
        search_id: 1,
        category: "Fix_n_flip".to_string(),
        city: "Tacoma".to_string(),
        description: String::new(),
        url: format!("{base}/city/17887/WA/Tacoma"),
    }
}

fn client(base: &str) -> Result<RedfinSearchClient> {
    let fetch = FetchConfig {
        base_url: base.to_string(),
        timeout_seconds: 5,
        ..FetchConfig::default()
    };
    Ok(RedfinSearchClient::new(&fetch)?)
}

#[tokio::test]
async fn test_fetches_and_parses_search_page() -> Result<()> {
    let body = r#"<html><body><script>window.searchResults = {"homes":[
        {"price":{"value":389000},"streetLine":{"value":"9 Elm Ave"},"city":"Tacoma",
         "postalCode":"98406","sqFt":{"value":1400},"url":"/WA/Tacoma/9-Elm-Ave/home/42"}]};</script></body></html>"#;
    let base = serve_once("200 OK", body.to_string()).await?;

    let listings = client(&base)?.fetch_listings(&search(&base)).await?;

    assert_eq!(listings.len(), 1);
    assert_eq!(listings[0].address.as_deref(), Some("9 Elm Ave"));
    assert_eq!(listings[0].price, Some(389_000));
    assert_eq!(listings[0].zip_code.as_deref(), Some("98406"));
    assert_eq!(
        listings[0].url.as_deref(),
        Some(format!("{base}/WA/Tacoma/9-Elm-Ave/home/42").as_str())
    );
    Ok(())
}

#[tokio::test]
async fn test_non_200_is_reported_as_api_error() -> Result<()> {
    let base = serve_once("503 Service Unavailable", "busy".to_string()).await?;

    let result = client(&base)?.fetch_listings(&search(&base)).await;

    assert!(matches!(result, Err(ScraperError::Api { message }) if message.contains("503")));
    Ok(())
}
