use tether_server::files::{StoredFile, TempFileRecord};

use crate::common::{TestApp, new_session_client, routes};

const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

/// Session identity issued in a `Set-Cookie` header.
fn session_from_set_cookie(value: &str) -> String {
    value
        .split(';')
        .next()
        .and_then(|pair| pair.trim().strip_prefix("tether_session="))
        .expect("Set-Cookie should carry the session cookie")
        .to_string()
}

mod upload {
    use super::*;

    #[tokio::test]
    async fn upload_returns_public_representation() {
        let app = TestApp::spawn().await;

        let res = app.upload("Quarterly Report.pdf", b"%PDF-1.4 body".to_vec()).await;

        assert_eq!(res.status, 201, "upload failed: {}", res.text);
        let id = res.id();
        assert_eq!(res.body["name"], "Quarterly Report.pdf");
        assert_eq!(res.body["basename"], "Quarterly Report");
        assert_eq!(res.body["extension"], "pdf");
        assert_eq!(res.body["size"], 13);
        assert_eq!(
            res.body["url"],
            format!("/api/v1/temp-files/{id}/Quarterly%20Report.pdf")
        );

        let object = res.body.as_object().unwrap();
        assert_eq!(object.len(), 6);
        assert!(!object.contains_key("pathname"));
        assert!(!object.contains_key("disk"));
        assert!(!object.contains_key("uuid"));
    }

    #[tokio::test]
    async fn first_upload_issues_session_cookie() {
        let app = TestApp::spawn().await;

        let first = app.upload("a.txt", b"a".to_vec()).await;
        assert_eq!(first.status, 201);
        let cookie = first
            .header("set-cookie")
            .expect("first upload should set the session cookie");
        assert!(cookie.starts_with("tether_session="));
        assert!(cookie.contains("HttpOnly"));

        let second = app.upload("b.txt", b"b".to_vec()).await;
        assert_eq!(second.status, 201);
        assert!(second.header("set-cookie").is_none());
    }

    #[tokio::test]
    async fn staged_record_is_bound_to_session() {
        let app = TestApp::spawn().await;

        let res = app.upload("notes.txt", b"hello".to_vec()).await;
        assert_eq!(res.status, 201);
        let session = session_from_set_cookie(res.header("set-cookie").unwrap());

        let record = TempFileRecord::find_for_session(&app.db, res.id(), "notes.txt", &session)
            .await
            .expect("record should belong to the issued session");
        assert_eq!(record.disk, "temp");
        assert_eq!(record.dir(), "");
        assert!(record.pathname.starts_with("notes-"));
        assert!(record.exists(&app.files).await.unwrap());
    }

    #[tokio::test]
    async fn missing_file_field_is_rejected() {
        let app = TestApp::spawn().await;
        let form = reqwest::multipart::Form::new().text("comment", "no file here");

        let res = app.post_form(form).await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn unsafe_filenames_are_rejected() {
        let app = TestApp::spawn().await;

        for name in [".env", ".."] {
            let res = app.upload(name, b"x".to_vec()).await;
            assert_eq!(res.status, 400, "{name:?} should be rejected: {}", res.text);
            assert_eq!(res.body["code"], "VALIDATION_ERROR");
        }
    }

    #[tokio::test]
    async fn oversized_upload_is_rejected() {
        let app = TestApp::spawn_with(|config| config.upload.max_size = 16).await;

        let res = app.upload("big.bin", vec![7u8; 100]).await;

        assert_eq!(res.status, 413);
        assert_eq!(res.body["code"], "PAYLOAD_TOO_LARGE");
    }
}

mod fetch {
    use super::*;

    #[tokio::test]
    async fn owner_session_can_fetch_content() {
        let app = TestApp::spawn().await;
        let uploaded = app.upload("logo.png", PNG.to_vec()).await;
        assert_eq!(uploaded.status, 201);

        let res = app.get(&routes::temp_file(uploaded.id(), "logo.png")).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.header("content-type"), Some("image/png"));
        assert_eq!(res.header("content-length"), Some("12"));
        assert_eq!(
            res.header("content-disposition"),
            Some("inline; filename=\"logo.png\"; filename*=UTF-8''logo.png")
        );
    }

    #[tokio::test]
    async fn fetch_via_returned_url() {
        let app = TestApp::spawn().await;
        let uploaded = app.upload("my notes.txt", b"plain words".to_vec()).await;
        assert_eq!(uploaded.status, 201);

        let res = app.get(uploaded.body["url"].as_str().unwrap()).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.text, "plain words");
    }

    #[tokio::test]
    async fn other_session_gets_same_not_found_as_missing_id() {
        let app = TestApp::spawn().await;
        let uploaded = app.upload("secret.txt", b"mine".to_vec()).await;
        assert_eq!(uploaded.status, 201);
        let id = uploaded.id();

        let stranger = new_session_client();
        let wrong_session = app
            .get_as(&stranger, &routes::temp_file(id, "secret.txt"))
            .await;
        let missing_id = app.get(&routes::temp_file(id + 1000, "secret.txt")).await;
        let wrong_name = app.get(&routes::temp_file(id, "other.txt")).await;

        for res in [&wrong_session, &missing_id, &wrong_name] {
            assert_eq!(res.status, 404);
            assert_eq!(res.body["code"], "NOT_FOUND");
        }
        assert_eq!(wrong_session.text, missing_id.text);
        assert_eq!(wrong_name.text, missing_id.text);
    }

    #[tokio::test]
    async fn malformed_id_gets_structured_not_found() {
        let app = TestApp::spawn().await;
        let missing_id = app.get(&routes::temp_file(4242, "secret.txt")).await;

        let res = app
            .get(&format!("{}/abc/secret.txt", routes::TEMP_FILES))
            .await;

        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "NOT_FOUND");
        assert_eq!(res.text, missing_id.text);
    }
}

#[tokio::test]
async fn openapi_document_lists_temp_file_routes() {
    let app = TestApp::spawn().await;

    let res = app.get(routes::OPENAPI).await;

    assert_eq!(res.status, 200);
    let paths = res.body["paths"].as_object().unwrap();
    assert!(
        paths
            .keys()
            .any(|path| path.trim_end_matches('/') == routes::TEMP_FILES)
    );
    assert!(paths.contains_key("/api/v1/temp-files/{id}/{name}"));
}
