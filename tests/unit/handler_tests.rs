// End-to-end handler tests against a mocked upstream

use image::{DynamicImage, GenericImageView, ImageOutputFormat};
use imgate::config::Config;
use imgate::proxy::{GatewayRequest, GatewayResponse, RequestHandler};
use std::io::Cursor;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SUPPORTED_TYPES_DETAIL: &str =
    "Unsupported media type. (Only support: image/png, image/jpeg, image/heif, image/heic, image/webp)";

fn encode(image: &DynamicImage, format: ImageOutputFormat) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    image.write_to(&mut out, format).unwrap();
    out.into_inner()
}

/// 400x300 gradient, encoded as JPEG
fn sample_jpeg() -> Vec<u8> {
    let img = image::RgbImage::from_fn(400, 300, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    });
    encode(&DynamicImage::ImageRgb8(img), ImageOutputFormat::Jpeg(90))
}

async fn upstream_with(body: Vec<u8>, content_type: &str) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, content_type))
        .mount(&server)
        .await;
    server
}

fn handler(config: &Config) -> RequestHandler {
    RequestHandler::new(config).unwrap()
}

fn detail(response: &GatewayResponse) -> String {
    let body: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
    assert_eq!(body["status_code"], response.status);
    body["detail"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_format_png_from_jpeg_upstream() {
    let server = upstream_with(sample_jpeg(), "image/jpeg").await;
    let request = GatewayRequest::get(&format!("/format(png)/{}/photo.jpg", server.uri()));

    let response = handler(&Config::default()).handle(&request).await;

    assert_eq!(response.status, 200);
    assert_eq!(response.content_type.as_deref(), Some("image/png"));
    let decoded = image::load_from_memory(&response.body).unwrap();
    assert_eq!(decoded.dimensions(), (400, 300));
}

#[tokio::test]
async fn test_unsupported_output_format_lists_input_types() {
    let server = upstream_with(sample_jpeg(), "image/jpeg").await;
    let request = GatewayRequest::get(&format!("/format(txt)/{}/photo.jpg", server.uri()));

    let response = handler(&Config::default()).handle(&request).await;

    assert_eq!(response.status, 400);
    assert_eq!(detail(&response), SUPPORTED_TYPES_DETAIL);
}

#[tokio::test]
async fn test_malformed_scheme_is_rejected() {
    let request = GatewayRequest::get("/format(png)/hhttps://example.com/photo.jpg");

    let response = handler(&Config::default()).handle(&request).await;

    assert_eq!(response.status, 400);
    assert_eq!(
        detail(&response),
        "Unsupported scheme. (Only support: http, https)"
    );
}

#[tokio::test]
async fn test_webp_with_size_fits_the_box() {
    let server = upstream_with(sample_jpeg(), "image/jpeg").await;
    let request = GatewayRequest::get(&format!(
        "/format(webp):size(200,200)/{}/photo.jpg",
        server.uri()
    ));

    let response = handler(&Config::default()).handle(&request).await;

    assert_eq!(response.status, 200);
    assert_eq!(response.content_type.as_deref(), Some("image/webp"));
    let decoded = image::load_from_memory(&response.body).unwrap();
    assert_eq!(decoded.dimensions(), (200, 150));
}

#[tokio::test]
async fn test_small_box_never_upscales() {
    let server = upstream_with(sample_jpeg(), "image/jpeg").await;
    let request = GatewayRequest::get(&format!(
        "/format(png):size(1000,1000)/{}/photo.jpg",
        server.uri()
    ));

    let response = handler(&Config::default()).handle(&request).await;

    let decoded = image::load_from_memory(&response.body).unwrap();
    assert_eq!(decoded.dimensions(), (400, 300));
}

#[tokio::test]
async fn test_repeated_webp_requests_are_byte_identical() {
    let server = upstream_with(sample_jpeg(), "image/jpeg").await;
    let handler = handler(&Config::default());
    let request = GatewayRequest::get(&format!(
        "/format(webp):quality(60)/{}/photo.jpg",
        server.uri()
    ));

    let first = handler.handle(&request).await;
    let second = handler.handle(&request).await;

    assert_eq!(first.status, 200);
    assert_eq!(first.body, second.body);
}

#[tokio::test]
async fn test_default_output_is_png() {
    let server = upstream_with(sample_jpeg(), "image/jpeg").await;
    let request = GatewayRequest::get(&format!("/size(100,100)/{}/photo.jpg", server.uri()));

    let response = handler(&Config::default()).handle(&request).await;

    assert_eq!(response.status, 200);
    assert_eq!(response.content_type.as_deref(), Some("image/png"));
    let decoded = image::load_from_memory(&response.body).unwrap();
    assert_eq!(decoded.dimensions(), (100, 75));
}

#[tokio::test]
async fn test_jpg_alias_and_percent_encoded_target() {
    let server = upstream_with(sample_jpeg(), "image/jpeg").await;
    let target = format!("{}/photo.jpg", server.uri());
    let request = GatewayRequest::get(&format!(
        "/format(jpg)/{}",
        urlencoding::encode(&target)
    ));

    let response = handler(&Config::default()).handle(&request).await;

    assert_eq!(response.status, 200);
    assert_eq!(response.content_type.as_deref(), Some("image/jpeg"));
}

#[tokio::test]
async fn test_query_and_headers_are_forwarded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/photo.jpg"))
        .and(query_param("v", "2"))
        .and(header("user-agent", "gallery-bot/1.0"))
        .and(header("referer", "http://127.0.0.1"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(sample_jpeg(), "image/jpeg"))
        .expect(1)
        .mount(&server)
        .await;

    let request = GatewayRequest::get(&format!("/format(png)/{}/photo.jpg?v=2", server.uri()))
        .with_user_agent("gallery-bot/1.0");
    let response = handler(&Config::default()).handle(&request).await;

    assert_eq!(response.status, 200);
}

#[tokio::test]
async fn test_non_image_upstream_is_forbidden() {
    let server = upstream_with(b"<html>nope</html>".to_vec(), "text/html").await;
    let request = GatewayRequest::get(&format!("/format(png)/{}/page", server.uri()));

    let response = handler(&Config::default()).handle(&request).await;

    assert_eq!(response.status, 403);
    assert_eq!(detail(&response), SUPPORTED_TYPES_DETAIL);
}

#[tokio::test]
async fn test_oversized_upstream_is_rejected() {
    let server = upstream_with(sample_jpeg(), "image/jpeg").await;
    let mut config = Config::default();
    config.fetch.max_file_size = 100;
    let request = GatewayRequest::get(&format!("/format(png)/{}/photo.jpg", server.uri()));

    let response = handler(&config).handle(&request).await;

    assert_eq!(response.status, 413);
    assert_eq!(detail(&response), "Max file size is 100 bytes");
}

#[tokio::test]
async fn test_corrupt_payload_is_unprocessable() {
    let server = upstream_with(b"definitely not a png".to_vec(), "image/png").await;
    let request = GatewayRequest::get(&format!("/format(png)/{}/broken.png", server.uri()));

    let response = handler(&Config::default()).handle(&request).await;

    assert_eq!(response.status, 422);
}

#[tokio::test]
async fn test_gif_payload_is_rejected_as_animated() {
    let gif = encode(
        &DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(8, 8, image::Rgba([0, 0, 0, 255]))),
        ImageOutputFormat::Gif,
    );
    // Mislabelled upstream: the payload itself is sniffed
    let server = upstream_with(gif, "image/png").await;
    let request = GatewayRequest::get(&format!("/format(png)/{}/anim.png", server.uri()));

    let response = handler(&Config::default()).handle(&request).await;

    assert_eq!(response.status, 400);
}

#[tokio::test]
async fn test_unreachable_upstream_is_bad_gateway() {
    let request = GatewayRequest::get("/format(png)/http://127.0.0.1:1/photo.jpg");

    let response = handler(&Config::default()).handle(&request).await;

    assert_eq!(response.status, 502);
}

#[tokio::test]
async fn test_access_log_records_failures() {
    let handler = handler(&Config::default());
    let request = GatewayRequest::get("/format(png)/ftp://example.com/a.png").with_host("img.local");

    let (response, record) = handler.handle_logged(&request).await;
    let record = record.unwrap();

    assert_eq!(response.status, 400);
    assert_eq!(record.status, 400);
    assert_eq!(record.method, "GET");
    assert_eq!(record.url, "/format(png)/ftp://example.com/a.png");
    assert_eq!(record.size, response.body.len());
    assert_eq!(
        record.error.as_deref(),
        Some("Unsupported scheme. (Only support: http, https)")
    );
}

#[tokio::test]
async fn test_cors_origin_from_config() {
    let mut config = Config::default();
    config.server.cors_allow_origin = "https://app.example.com".to_string();

    let response = handler(&config).handle(&GatewayRequest::get("/health")).await;

    assert_eq!(
        response.header("Access-Control-Allow-Origin"),
        Some("https://app.example.com")
    );
}
