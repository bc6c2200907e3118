use actix_web::cookie::Key;
use uuid::Uuid;

use crate::app::AppState;
use crate::media::MediaStore;

/// Fresh state over a throwaway database file and media root; every test
/// gets its own so they can run in parallel.
pub fn test_state() -> AppState {
    let dir = std::env::temp_dir().join("inkpost-tests");
    std::fs::create_dir_all(&dir).expect("test scratch directory");

    let db_path = dir.join(format!("{}.db", Uuid::new_v4()));
    let mut app_state = AppState::new(Some(db_path.to_str().unwrap()));
    app_state.media = MediaStore {
        root: dir.join(format!("media-{}", Uuid::new_v4())),
    };

    app_state
}

/// A fixed signing key so every service instance in a test reads the
/// cookies it wrote.
pub fn test_key() -> Key {
    Key::from(&[42; 64])
}

const BOUNDARY: &str = "X-INKPOST-TEST-BOUNDARY";

fn content_type() -> String {
    format!("multipart/form-data; boundary={}", BOUNDARY)
}

fn push_text_fields(body: &mut Vec<u8>, fields: &[(&str, &str)]) {
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
    }
}

/// Encodes text fields the way a browser multipart form submit would.
/// Returns the matching content-type header value and the body.
pub fn multipart_body(fields: &[(&str, &str)]) -> (String, Vec<u8>) {
    let mut body = Vec::new();
    push_text_fields(&mut body, fields);
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    (content_type(), body)
}

/// Same as [multipart_body], with one file part appended.
pub fn multipart_body_with_file(
    fields: &[(&str, &str)],
    file_field: &str,
    filename: &str,
    data: &[u8],
) -> (String, Vec<u8>) {
    let mut body = Vec::new();
    push_text_fields(&mut body, fields);
    body.extend_from_slice(
        format!(
            "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
            BOUNDARY, file_field, filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

    (content_type(), body)
}
