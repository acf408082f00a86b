use reqwest::Method;
use reqwest::multipart::Form;
use serde_json::Value;

use crate::common::{
    ADMIN_KEY, TestApp, file_part, media_segments, png_bytes, poster_form, routes,
};

fn id_of(body: &Value) -> i32 {
    body["id"].as_i64().expect("poster should have an id") as i32
}

mod create_poster {
    use super::*;

    #[tokio::test]
    async fn admin_can_create_poster() {
        let app = TestApp::spawn().await;

        let res = app
            .send_form(
                Method::POST,
                routes::POSTERS,
                poster_form("Poster A", 2023),
                Some(ADMIN_KEY),
            )
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert!(res.id() > 0);
        assert_eq!(res.body["title"], "Poster A");
        assert_eq!(res.body["year"], 2023);
        assert_eq!(res.body["hidden"], false);
        assert_eq!(res.body["award"], "");
        assert_eq!(res.body["type"], "");
        assert_eq!(res.body["area"], "");
        assert_eq!(res.body["description"], "");
        assert!(res.body["pdf_url"].is_null());

        let image_url = res.body["image_url"].as_str().unwrap();
        assert!(
            image_url.starts_with(&format!("http://{}/media/", app.addr)),
            "{image_url}"
        );
        assert!(image_url.ends_with("/poster.png"));
        assert!(res.body.get("image_hash").is_none());
        assert_eq!(app.poster_count().await, 1);
    }

    #[tokio::test]
    async fn optional_fields_and_pdf_are_stored() {
        let app = TestApp::spawn().await;
        let form = poster_form("Full Poster", 2022)
            .text("award", "Gold")
            .text("type", "Research")
            .text("area", "Synthetic biology")
            .text("description", "  Engineered yeast.  ")
            .text("hidden", "true")
            .part(
                "pdf",
                file_part("Final Report (v2).PDF", b"%PDF-1.7 body".to_vec(), "application/pdf"),
            );

        let res = app
            .send_form(Method::POST, routes::POSTERS, form, Some(ADMIN_KEY))
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["award"], "Gold");
        assert_eq!(res.body["type"], "Research");
        assert_eq!(res.body["description"], "Engineered yeast.");
        assert_eq!(res.body["hidden"], true);
        let pdf_url = res.body["pdf_url"].as_str().unwrap();
        assert!(pdf_url.ends_with("/final-report-v2.pdf"), "{pdf_url}");
        assert_eq!(app.blob_count(), 2);
    }

    #[tokio::test]
    async fn missing_admin_key_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app
            .send_form(Method::POST, routes::POSTERS, poster_form("Nope", 2023), None)
            .await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "ADMIN_KEY_MISSING");
        assert_eq!(app.poster_count().await, 0);
        assert_eq!(app.blob_count(), 0);
    }

    #[tokio::test]
    async fn wrong_admin_key_is_forbidden() {
        let app = TestApp::spawn().await;

        let res = app
            .send_form(
                Method::POST,
                routes::POSTERS,
                poster_form("Nope", 2023),
                Some("not-the-admin-key"),
            )
            .await;

        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "ADMIN_KEY_INVALID");
        assert_eq!(app.poster_count().await, 0);
    }

    #[tokio::test]
    async fn missing_image_is_a_field_error() {
        let app = TestApp::spawn().await;
        let form = Form::new().text("title", "No image").text("year", "2023");

        let res = app
            .send_form(Method::POST, routes::POSTERS, form, Some(ADMIN_KEY))
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
        assert!(res.body["fields"]["image"].is_string(), "{}", res.text);
        assert!(res.body["message"].as_str().unwrap().contains("image"));
        assert_eq!(app.poster_count().await, 0);
    }

    #[tokio::test]
    async fn all_field_errors_are_reported_and_blobs_released() {
        let app = TestApp::spawn().await;
        let form = Form::new()
            .text("title", "   ")
            .text("year", "MMXXIII")
            .part("image", file_part("poster.png", png_bytes("bad"), "image/png"));

        let res = app
            .send_form(Method::POST, routes::POSTERS, form, Some(ADMIN_KEY))
            .await;

        assert_eq!(res.status, 400);
        let fields = res.body["fields"].as_object().unwrap();
        assert!(fields.contains_key("title"));
        assert!(fields.contains_key("year"));
        assert!(!fields.contains_key("image"));
        assert_eq!(app.poster_count().await, 0);
        assert_eq!(app.blob_count(), 0);
    }

    #[tokio::test]
    async fn non_image_file_is_rejected() {
        let app = TestApp::spawn().await;
        let form = Form::new()
            .text("title", "Text file")
            .text("year", "2023")
            .part("image", file_part("notes.txt", b"hello".to_vec(), "text/plain"));

        let res = app
            .send_form(Method::POST, routes::POSTERS, form, Some(ADMIN_KEY))
            .await;

        assert_eq!(res.status, 400);
        assert!(res.body["fields"]["image"].is_string());
        assert_eq!(app.blob_count(), 0);
    }

    #[tokio::test]
    async fn oversized_image_is_too_large() {
        let app = TestApp::spawn_with(|config| config.storage.max_blob_size = 16).await;
        let form = Form::new()
            .text("title", "Huge")
            .text("year", "2023")
            .part("image", file_part("huge.png", vec![7u8; 64], "image/png"));

        let res = app
            .send_form(Method::POST, routes::POSTERS, form, Some(ADMIN_KEY))
            .await;

        assert_eq!(res.status, 413);
        assert_eq!(res.body["code"], "PAYLOAD_TOO_LARGE");
        assert_eq!(app.poster_count().await, 0);
        assert_eq!(app.blob_count(), 0);
        assert_eq!(app.staged_count(), 0);
    }

    #[tokio::test]
    async fn empty_image_is_rejected_and_released() {
        let app = TestApp::spawn().await;
        let form = Form::new()
            .text("title", "Blank")
            .text("year", "2023")
            .part("image", file_part("blank.png", Vec::new(), "image/png"));

        let res = app
            .send_form(Method::POST, routes::POSTERS, form, Some(ADMIN_KEY))
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["fields"]["image"], "The submitted file is empty.");
        assert_eq!(app.poster_count().await, 0);
        assert_eq!(app.blob_count(), 0);
        assert_eq!(app.staged_count(), 0);
    }

    #[tokio::test]
    async fn upload_is_stored_byte_for_byte() {
        let app = TestApp::spawn().await;
        let image = png_bytes("streamed");
        let form = Form::new()
            .text("title", "Streamed")
            .text("year", "2023")
            .part("image", file_part("streamed.png", image.clone(), "image/png"));

        let res = app
            .send_form(Method::POST, routes::POSTERS, form, Some(ADMIN_KEY))
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        let url = res.body["image_url"].as_str().unwrap();
        let media = app.client.get(url).send().await.unwrap();
        assert_eq!(media.bytes().await.unwrap().as_ref(), image.as_slice());
        assert_eq!(app.staged_count(), 0);
    }
}

mod list_posters {
    use super::*;

    #[tokio::test]
    async fn ordered_by_year_then_id_descending() {
        let app = TestApp::spawn().await;
        let old = id_of(&app.create_poster("Old", 2019).await);
        let first = id_of(&app.create_poster("First 2023", 2023).await);
        let second = id_of(&app.create_poster("Second 2023", 2023).await);
        let mid = id_of(&app.create_poster("Mid", 2021).await);

        assert_eq!(app.list_ids("").await, vec![second, first, mid, old]);
    }

    #[tokio::test]
    async fn hidden_posters_need_include_hidden() {
        let app = TestApp::spawn().await;
        let visible = id_of(&app.create_poster("Visible", 2023).await);
        let hidden = id_of(&app.create_poster("Hidden", 2024).await);
        app.hide(hidden).await;

        assert_eq!(app.list_ids("").await, vec![visible]);
        for token in ["1", "true", "True", "yes"] {
            assert_eq!(
                app.list_ids(&format!("?include_hidden={token}")).await,
                vec![hidden, visible],
                "include_hidden={token}"
            );
        }
        for token in ["0", "false", "TRUE", "on", ""] {
            assert_eq!(
                app.list_ids(&format!("?include_hidden={token}")).await,
                vec![visible],
                "include_hidden={token}"
            );
        }
    }

    #[tokio::test]
    async fn repeated_include_hidden_uses_last_value() {
        let app = TestApp::spawn().await;
        let visible = id_of(&app.create_poster("Visible", 2023).await);
        let hidden = id_of(&app.create_poster("Hidden", 2024).await);
        app.hide(hidden).await;

        assert_eq!(
            app.list_ids("?include_hidden=0&include_hidden=1").await,
            vec![hidden, visible]
        );
        assert_eq!(
            app.list_ids("?include_hidden=1&include_hidden=0").await,
            vec![visible]
        );
        assert_eq!(
            app.list_ids("?include_hidden=1&unknown=x").await,
            vec![hidden, visible]
        );
    }

    #[tokio::test]
    async fn default_list_is_the_visible_subset() {
        let app = TestApp::spawn().await;
        for (i, year) in [2020, 2022, 2021, 2022, 2019].into_iter().enumerate() {
            let id = id_of(&app.create_poster(&format!("Poster {i}"), year).await);
            if i % 2 == 1 {
                app.hide(id).await;
            }
        }

        let all = app.get(&format!("{}?include_hidden=1", routes::POSTERS)).await;
        let expected: Vec<i32> = all
            .body
            .as_array()
            .unwrap()
            .iter()
            .filter(|p| p["hidden"] == false)
            .map(id_of)
            .collect();

        assert_eq!(app.list_ids("").await, expected);
        assert_eq!(expected.len(), 3);
    }
}

mod get_poster {
    use super::*;

    #[tokio::test]
    async fn hidden_poster_is_still_retrievable() {
        let app = TestApp::spawn().await;
        let id = id_of(&app.create_poster("Secret", 2023).await);
        app.hide(id).await;

        let res = app.get(&routes::poster(id)).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["hidden"], true);
    }

    #[tokio::test]
    async fn missing_poster_is_not_found() {
        let app = TestApp::spawn().await;

        let res = app.get(&routes::poster(999)).await;

        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "NOT_FOUND");
    }
}

mod update_poster {
    use super::*;

    #[tokio::test]
    async fn title_only_update_leaves_other_fields() {
        let app = TestApp::spawn().await;
        let form = poster_form("Before", 2021)
            .text("award", "Silver")
            .part("pdf", file_part("doc.pdf", b"%PDF".to_vec(), "application/pdf"));
        let created = app
            .send_form(Method::POST, routes::POSTERS, form, Some(ADMIN_KEY))
            .await
            .body;
        let id = id_of(&created);

        let res = app
            .send_form(
                Method::PATCH,
                &routes::poster(id),
                Form::new().text("title", "After"),
                Some(ADMIN_KEY),
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        let mut expected = created.clone();
        expected["title"] = Value::from("After");
        assert_eq!(res.body, expected);
    }

    #[tokio::test]
    async fn put_is_also_partial() {
        let app = TestApp::spawn().await;
        let created = app.create_poster("Put me", 2020).await;
        let id = id_of(&created);

        let res = app
            .send_form(
                Method::PUT,
                &routes::poster(id),
                Form::new().text("year", "2024").text("hidden", "yes"),
                Some(ADMIN_KEY),
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["year"], 2024);
        assert_eq!(res.body["hidden"], true);
        assert_eq!(res.body["title"], "Put me");
        assert_eq!(res.body["image_url"], created["image_url"]);
    }

    #[tokio::test]
    async fn empty_pdf_part_removes_pdf() {
        let app = TestApp::spawn().await;
        let form = poster_form("With pdf", 2021)
            .part("pdf", file_part("doc.pdf", b"%PDF-x".to_vec(), "application/pdf"));
        let id = app
            .send_form(Method::POST, routes::POSTERS, form, Some(ADMIN_KEY))
            .await
            .id();
        assert_eq!(app.blob_count(), 2);

        let res = app
            .send_form(
                Method::PATCH,
                &routes::poster(id),
                Form::new().text("pdf", ""),
                Some(ADMIN_KEY),
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert!(res.body["pdf_url"].is_null());
        assert_eq!(app.blob_count(), 1);
    }

    #[tokio::test]
    async fn replacing_image_releases_old_blob() {
        let app = TestApp::spawn().await;
        let created = app.create_poster("Swap", 2021).await;
        let id = id_of(&created);
        let form = Form::new().part(
            "image",
            file_part("new.jpg", png_bytes("replacement"), "image/jpeg"),
        );

        let res = app
            .send_form(Method::PATCH, &routes::poster(id), form, Some(ADMIN_KEY))
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert!(res.body["image_url"].as_str().unwrap().ends_with("/new.jpg"));
        assert_eq!(app.blob_count(), 1);

        let (hash, name) = media_segments(created["image_url"].as_str().unwrap());
        assert_eq!(app.get(&routes::media(&hash, &name)).await.status, 404);
    }

    #[tokio::test]
    async fn invalid_update_changes_nothing() {
        let app = TestApp::spawn().await;
        let created = app.create_poster("Stable", 2021).await;
        let id = id_of(&created);
        let form = Form::new()
            .text("year", "soon")
            .part("image", file_part("other.png", png_bytes("other"), "image/png"));

        let res = app
            .send_form(Method::PATCH, &routes::poster(id), form, Some(ADMIN_KEY))
            .await;

        assert_eq!(res.status, 400);
        assert!(res.body["fields"]["year"].is_string());
        assert_eq!(app.get(&routes::poster(id)).await.body, created);
        assert_eq!(app.blob_count(), 1);
    }

    #[tokio::test]
    async fn missing_key_leaves_record_unchanged() {
        let app = TestApp::spawn().await;
        let created = app.create_poster("Guarded", 2021).await;
        let id = id_of(&created);

        let res = app
            .send_form(
                Method::PATCH,
                &routes::poster(id),
                Form::new().text("title", "Hijacked"),
                None,
            )
            .await;

        assert_eq!(res.status, 401);
        assert_eq!(app.get(&routes::poster(id)).await.body, created);
    }

    #[tokio::test]
    async fn missing_poster_is_not_found() {
        let app = TestApp::spawn().await;

        let res = app
            .send_form(
                Method::PATCH,
                &routes::poster(42),
                Form::new()
                    .text("title", "Ghost")
                    .part("image", file_part("ghost.png", png_bytes("ghost"), "image/png")),
                Some(ADMIN_KEY),
            )
            .await;

        assert_eq!(res.status, 404);
        assert_eq!(app.blob_count(), 0);
    }
}

mod hide_poster {
    use super::*;

    #[tokio::test]
    async fn hide_then_unhide_round_trip() {
        let app = TestApp::spawn().await;
        let created = app.create_poster("Poster A", 2023).await;
        let id = id_of(&created);

        let res = app
            .send_empty(Method::POST, &routes::hide(id), Some(ADMIN_KEY))
            .await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body, serde_json::json!({"status": "hidden"}));
        assert!(app.list_ids("").await.is_empty());
        assert_eq!(app.list_ids("?include_hidden=1").await, vec![id]);

        let res = app
            .send_empty(Method::POST, &routes::unhide(id), Some(ADMIN_KEY))
            .await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body, serde_json::json!({"status": "visible"}));

        assert_eq!(app.get(&routes::poster(id)).await.body, created);
        assert_eq!(app.list_ids("").await, vec![id]);
    }

    #[tokio::test]
    async fn hide_only_touches_that_poster() {
        let app = TestApp::spawn().await;
        let a = id_of(&app.create_poster("A", 2023).await);
        let b = id_of(&app.create_poster("B", 2023).await);

        app.hide(a).await;

        assert_eq!(app.get(&routes::poster(b)).await.body["hidden"], false);
    }

    #[tokio::test]
    async fn requires_admin_key() {
        let app = TestApp::spawn().await;
        let id = id_of(&app.create_poster("A", 2023).await);

        let missing = app.send_empty(Method::POST, &routes::hide(id), None).await;
        let wrong = app
            .send_empty(Method::POST, &routes::unhide(id), Some("guess"))
            .await;

        assert_eq!(missing.status, 401);
        assert_eq!(wrong.status, 403);
        assert_eq!(app.get(&routes::poster(id)).await.body["hidden"], false);
    }

    #[tokio::test]
    async fn missing_poster_is_not_found() {
        let app = TestApp::spawn().await;

        let hide = app
            .send_empty(Method::POST, &routes::hide(7), Some(ADMIN_KEY))
            .await;
        let unhide = app
            .send_empty(Method::POST, &routes::unhide(7), Some(ADMIN_KEY))
            .await;

        assert_eq!(hide.status, 404);
        assert_eq!(unhide.status, 404);
    }
}

mod delete_poster {
    use super::*;

    #[tokio::test]
    async fn delete_removes_record_and_files() {
        let app = TestApp::spawn().await;
        let id = id_of(&app.create_poster("Doomed", 2023).await);
        assert_eq!(app.blob_count(), 1);

        let res = app
            .send_empty(Method::DELETE, &routes::poster(id), Some(ADMIN_KEY))
            .await;

        assert_eq!(res.status, 204);
        assert_eq!(app.get(&routes::poster(id)).await.status, 404);
        assert_eq!(app.poster_count().await, 0);
        assert_eq!(app.blob_count(), 0);
    }

    #[tokio::test]
    async fn shared_files_survive_until_last_reference() {
        let app = TestApp::spawn().await;
        let same_image = || {
            Form::new()
                .text("title", "Twin")
                .text("year", "2023")
                .part("image", file_part("twin.png", png_bytes("twin"), "image/png"))
        };
        let first = app
            .send_form(Method::POST, routes::POSTERS, same_image(), Some(ADMIN_KEY))
            .await;
        let second = app
            .send_form(Method::POST, routes::POSTERS, same_image(), Some(ADMIN_KEY))
            .await;
        assert_eq!(app.blob_count(), 1);

        let res = app
            .send_empty(Method::DELETE, &routes::poster(first.id()), Some(ADMIN_KEY))
            .await;
        assert_eq!(res.status, 204);

        let (hash, name) = media_segments(second.body["image_url"].as_str().unwrap());
        assert_eq!(app.get(&routes::media(&hash, &name)).await.status, 200);
        assert_eq!(app.blob_count(), 1);
    }

    #[tokio::test]
    async fn missing_poster_is_not_found() {
        let app = TestApp::spawn().await;
        app.create_poster("Keep", 2023).await;

        let res = app
            .send_empty(Method::DELETE, &routes::poster(999), Some(ADMIN_KEY))
            .await;

        assert_eq!(res.status, 404);
        assert_eq!(app.poster_count().await, 1);
    }

    #[tokio::test]
    async fn requires_admin_key() {
        let app = TestApp::spawn().await;
        let id = id_of(&app.create_poster("Keep", 2023).await);

        let res = app.send_empty(Method::DELETE, &routes::poster(id), None).await;

        assert_eq!(res.status, 401);
        assert_eq!(app.poster_count().await, 1);
    }
}
