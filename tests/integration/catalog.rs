use axum::http::StatusCode;
use serde_json::Value;

use crate::TestApp;

async fn seed_author(app: &TestApp, first: &str, family: &str) -> String {
    app.create(
        "author",
        &[
            ("first_name", first),
            ("family_name", family),
            ("date_of_birth", "1929-10-21"),
        ],
    )
    .await
}

async fn seed_genre(app: &TestApp, name: &str) -> String {
    app.create("genre", &[("name", name)]).await
}

async fn seed_book(app: &TestApp, title: &str, author: &str, genres: &[&str]) -> String {
    let mut fields = vec![
        ("title", title),
        ("author", author),
        ("summary", "A summary"),
        ("isbn", "9780000000000"),
    ];
    fields.extend(genres.iter().map(|id| ("genre", *id)));
    app.create("book", &fields).await
}

fn ids(list: &Value) -> Vec<String> {
    list.as_array()
        .expect("array")
        .iter()
        .map(|item| item["id"].as_str().expect("id").to_string())
        .collect()
}

fn flagged(list: &Value, mark: &str) -> Vec<String> {
    list.as_array()
        .expect("array")
        .iter()
        .filter(|item| item.get(mark) == Some(&Value::Bool(true)))
        .map(|item| item["id"].as_str().expect("id").to_string())
        .collect()
}

fn messages(body: &Value) -> Vec<String> {
    body["data"]["errors"]
        .as_array()
        .map(|errors| {
            errors
                .iter()
                .map(|e| e["message"].as_str().unwrap_or_default().to_string())
                .collect()
        })
        .unwrap_or_default()
}

#[tokio::test]
async fn test_index_counts_records() {
    let app = TestApp::new();
    let author = seed_author(&app, "Ursula", "LeGuin").await;
    let genre = seed_genre(&app, "Fantasy").await;
    let book = seed_book(&app, "Tehanu", &author, &[&genre]).await;
    app.create(
        "bookinstance",
        &[("book", &book), ("imprint", "Atheneum"), ("status", "Available")],
    )
    .await;

    let response = app.get("/catalog").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["view"], "index");
    let data = &response.body["data"]["data"];
    assert_eq!(data["book_count"], 1);
    assert_eq!(data["book_instance_count"], 1);
    assert_eq!(data["book_instance_available_count"], 1);
    assert_eq!(data["author_count"], 1);
    assert_eq!(data["genre_count"], 1);
}

#[tokio::test]
async fn test_author_list_uses_locale_collation() {
    let app = TestApp::new();
    seed_author(&app, "Alexander", "Bell").await;
    seed_author(&app, "Edmond", "Émond").await;
    seed_author(&app, "Niels", "Abel").await;

    let response = app.get("/catalog/authors").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["view"], "author_list");
    let names: Vec<&str> = response.body["data"]["author_list"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["family_name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["Abel", "Bell", "Émond"]);
}

#[tokio::test]
async fn test_book_round_trip_keeps_sanitized_values_and_references() {
    let app = TestApp::new();
    let author = seed_author(&app, "Ursula", "LeGuin").await;
    let fantasy = seed_genre(&app, "Fantasy").await;
    let fiction = seed_genre(&app, "Fiction").await;

    let id = app
        .create(
            "book",
            &[
                ("title", "  Tom & Jerry "),
                ("author", &author),
                ("summary", " <i>cat</i> and mouse "),
                ("isbn", " 978-1 "),
                ("genre", &fiction),
                ("genre", &fantasy),
            ],
        )
        .await;

    let response = app.get(&format!("/catalog/book/{}", id)).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["view"], "book_detail");
    let book = &response.body["data"]["book"];
    assert_eq!(book["title"], "Tom &amp; Jerry");
    assert_eq!(book["summary"], "&lt;i&gt;cat&lt;&#x2F;i&gt; and mouse");
    assert_eq!(book["isbn"], "978-1");
    assert_eq!(book["author"]["id"], author.as_str());
    assert_eq!(book["author"]["name"], "LeGuin, Ursula");

    let mut genre_ids = ids(&book["genre"]);
    genre_ids.sort();
    let mut expected = vec![fantasy.clone(), fiction.clone()];
    expected.sort();
    assert_eq!(genre_ids, expected);
    // ordered by name
    assert_eq!(book["genre"][0]["name"], "Fantasy");
    assert_eq!(response.body["title"], "Tom &amp; Jerry");
}

#[tokio::test]
async fn test_single_genre_value_checks_exactly_that_genre() {
    let app = TestApp::new();
    let author = seed_author(&app, "Ursula", "LeGuin").await;
    let fantasy = seed_genre(&app, "Fantasy").await;
    seed_genre(&app, "Poetry").await;
    seed_genre(&app, "Science Fiction").await;

    let response = app
        .post_form(
            "/catalog/book/create",
            &[
                ("title", ""),
                ("author", &author),
                ("summary", "Earthsea"),
                ("isbn", "1"),
                ("genre", &fantasy),
            ],
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["view"], "book_form");
    assert_eq!(messages(&response.body), ["Title must not be empty."]);
    let data = &response.body["data"];
    assert_eq!(flagged(&data["genres"], "checked"), [fantasy]);
    assert_eq!(flagged(&data["authors"], "selected"), [author]);
    assert_eq!(data["book"]["summary"], "Earthsea");
}

#[tokio::test]
async fn test_book_with_two_authors_is_rejected() {
    let app = TestApp::new();
    let first = seed_author(&app, "Terry", "Pratchett").await;
    let second = seed_author(&app, "Neil", "Gaiman").await;

    let response = app
        .post_form(
            "/catalog/book/create",
            &[
                ("title", "Good Omens"),
                ("author", &first),
                ("author", &second),
                ("summary", "Apocalypse"),
                ("isbn", "2"),
            ],
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(messages(&response.body), ["Only one author may be selected."]);
    assert_eq!(app.get("/catalog").await.body["data"]["data"]["book_count"], 0);
}

#[tokio::test]
async fn test_blank_author_is_reported_as_empty() {
    let app = TestApp::new();
    seed_author(&app, "Ursula", "LeGuin").await;

    let response = app
        .post_form(
            "/catalog/book/create",
            &[
                ("title", "Tehanu"),
                ("author", ""),
                ("summary", "Earthsea"),
                ("isbn", "3"),
            ],
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["view"], "book_form");
    assert_eq!(messages(&response.body), ["Author must not be empty."]);
    assert!(flagged(&response.body["data"]["authors"], "selected").is_empty());
}

#[tokio::test]
async fn test_blank_genre_means_no_genre() {
    let app = TestApp::new();
    let author = seed_author(&app, "Ursula", "LeGuin").await;

    let response = app
        .post_form(
            "/catalog/book/create",
            &[
                ("title", "Tehanu"),
                ("author", &author),
                ("summary", "Earthsea"),
                ("isbn", "4"),
                ("genre", ""),
            ],
        )
        .await;
    assert_eq!(response.status, StatusCode::SEE_OTHER, "{:?}", response.body);
    let location = response.location.expect("redirect location");

    let detail = app.get(&location).await;
    assert_eq!(detail.status, StatusCode::OK);
    assert_eq!(detail.body["data"]["book"]["genre"], Value::Array(vec![]));
}

#[tokio::test]
async fn test_genre_reports_every_violated_rule() {
    let app = TestApp::new();
    let response = app.post_form("/catalog/genre/create", &[("name", "S1")]).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["view"], "genre_form");
    assert_eq!(
        messages(&response.body),
        [
            "Name must be alphabet letters.",
            "Name must be between 3 and 100 characters in length",
        ]
    );
    assert_eq!(response.body["data"]["genre"]["name"], "S1");
}

#[tokio::test]
async fn test_duplicate_genre_redirects_to_existing() {
    let app = TestApp::new();
    let id = seed_genre(&app, "Poetry").await;
    let again = app.post_form("/catalog/genre/create", &[("name", "Poetry")]).await;
    assert_eq!(again.status, StatusCode::SEE_OTHER);
    assert_eq!(again.location, Some(format!("/catalog/genre/{}", id)));

    let list = app.get("/catalog/genres").await;
    assert_eq!(ids(&list.body["data"]["genre_list"]), [id]);
}

#[tokio::test]
async fn test_delete_author_without_books() {
    let app = TestApp::new();
    let id = seed_author(&app, "Ursula", "LeGuin").await;

    let confirm = app.get(&format!("/catalog/author/{}/delete", id)).await;
    assert_eq!(confirm.status, StatusCode::OK);
    assert_eq!(confirm.body["view"], "author_delete");
    assert_eq!(confirm.body["data"]["author_books"], Value::Array(vec![]));

    let response = app
        .post_form(&format!("/catalog/author/{}/delete", id), &[])
        .await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location.as_deref(), Some("/catalog/authors"));

    let lookup = app.get(&format!("/catalog/author/{}", id)).await;
    assert_eq!(lookup.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_author_with_books_is_refused() {
    let app = TestApp::new();
    let author = seed_author(&app, "Ursula", "LeGuin").await;
    let book = seed_book(&app, "Tehanu", &author, &[]).await;

    let response = app
        .post_form(&format!("/catalog/author/{}/delete", author), &[])
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["view"], "author_delete");
    assert_eq!(ids(&response.body["data"]["author_books"]), [book.clone()]);

    let detail = app.get(&format!("/catalog/author/{}", author)).await;
    assert_eq!(detail.status, StatusCode::OK);
    assert_eq!(ids(&detail.body["data"]["author_books"]), [book.clone()]);
    let book_detail = app.get(&format!("/catalog/book/{}", book)).await;
    assert_eq!(book_detail.body["data"]["book"]["author"]["id"], author.as_str());
}

#[tokio::test]
async fn test_delete_of_missing_record_redirects_to_list() {
    let app = TestApp::new();
    let confirm = app.get("/catalog/genre/missing/delete").await;
    assert_eq!(confirm.status, StatusCode::SEE_OTHER);
    assert_eq!(confirm.location.as_deref(), Some("/catalog/genres"));

    let response = app.post_form("/catalog/genre/missing/delete", &[]).await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location.as_deref(), Some("/catalog/genres"));
}

#[tokio::test]
async fn test_missing_book_detail_is_not_found() {
    let app = TestApp::new();
    let response = app.get("/catalog/book/does-not-exist").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["code"], 5);
}

#[tokio::test]
async fn test_update_form_marks_stored_references() {
    let app = TestApp::new();
    let author = seed_author(&app, "Ursula", "LeGuin").await;
    seed_author(&app, "Iain", "Banks").await;
    let fantasy = seed_genre(&app, "Fantasy").await;
    seed_genre(&app, "Poetry").await;
    let book = seed_book(&app, "Tehanu", &author, &[&fantasy]).await;

    let response = app.get(&format!("/catalog/book/{}/update", book)).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["title"], "Update Book");
    let data = &response.body["data"];
    assert_eq!(flagged(&data["authors"], "selected"), [author]);
    assert_eq!(flagged(&data["genres"], "checked"), [fantasy]);
    assert!(data.get("errors").is_none());
}

#[tokio::test]
async fn test_update_book_instance() {
    let app = TestApp::new();
    let author = seed_author(&app, "Ursula", "LeGuin").await;
    let book = seed_book(&app, "Tehanu", &author, &[]).await;
    let copy = app
        .create(
            "bookinstance",
            &[("book", &book), ("imprint", "Atheneum, 1990")],
        )
        .await;

    let detail = app.get(&format!("/catalog/bookinstance/{}", copy)).await;
    assert_eq!(detail.body["title"], "Copy: Tehanu");
    assert_eq!(detail.body["data"]["bookinstance"]["status"], "Maintenance");

    let response = app
        .post_form(
            &format!("/catalog/bookinstance/{}/update", copy),
            &[
                ("book", &book),
                ("imprint", "Atheneum, 1990"),
                ("status", "Loaned"),
                ("due_back", "2026-11-05"),
            ],
        )
        .await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(
        response.location,
        Some(format!("/catalog/bookinstance/{}", copy))
    );

    let updated = app.get(&format!("/catalog/bookinstance/{}", copy)).await;
    let instance = &updated.body["data"]["bookinstance"];
    assert_eq!(instance["status"], "Loaned");
    assert_eq!(instance["due_back_formatted"], "Nov 5, 2026");

    let book_delete = app
        .post_form(&format!("/catalog/book/{}/delete", book), &[])
        .await;
    assert_eq!(book_delete.status, StatusCode::OK);
    assert_eq!(ids(&book_delete.body["data"]["book_instances"]), [copy]);
}

#[tokio::test]
async fn test_book_instance_list_sorted_by_book_title() {
    let app = TestApp::new();
    let author = seed_author(&app, "Ursula", "LeGuin").await;
    let tehanu = seed_book(&app, "Tehanu", &author, &[]).await;
    let lathe = seed_book(&app, "Lathe of Heaven", &author, &[]).await;
    for book in [&tehanu, &lathe] {
        app.create("bookinstance", &[("book", book), ("imprint", "Ace")])
            .await;
    }

    let response = app.get("/catalog/bookinstances").await;
    assert_eq!(response.body["title"], "Book Instance List");
    let titles: Vec<&str> = response.body["data"]["bookinstance_list"]
        .as_array()
        .unwrap()
        .iter()
        .map(|copy| copy["book"]["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, ["Lathe of Heaven", "Tehanu"]);
}
