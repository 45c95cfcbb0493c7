//! Subscriptions, comments, likes, playlists, tweets and dashboard.

mod common;

use common::TestServer;
use serde_json::{json, Value};
use videotube::config::RateLimitConfig;

fn id(value: &Value) -> String {
    value["_id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_subscriptions() {
    let server = TestServer::start().await;
    let (alice, alice_user) = server.signed_in("alice").await;
    let (bob, bob_user) = server.signed_in("bob").await;
    let channel = id(&alice_user);

    let subscribe = format!("/api/v1/subscriptions/{}/subscribe", channel);
    let unsubscribe = format!("/api/v1/subscriptions/{}/unsubscribe", channel);

    let response = alice.post(server.url(&subscribe)).send().await.unwrap();
    assert_eq!(response.status(), 400);

    let response = bob.post(server.url(&subscribe)).send().await.unwrap();
    assert_eq!(response.status(), 200);
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["data"]["isSubscribed"], true);

    let response = bob.post(server.url(&subscribe)).send().await.unwrap();
    assert_eq!(response.status(), 400);
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["message"], "User already subscribed to this channel");

    let response = bob
        .get(server.url("/api/v1/subscriptions"))
        .send()
        .await
        .unwrap();
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["data"][0]["_id"], alice_user["_id"]);
    assert_eq!(json["data"][0]["subscriberCount"], 1);

    let response = alice
        .get(server.url(&format!("/api/v1/subscriptions/c/{}", channel)))
        .send()
        .await
        .unwrap();
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["data"].as_array().unwrap().len(), 1);
    assert_eq!(json["data"][0]["_id"], bob_user["_id"]);

    let response = bob.post(server.url(&unsubscribe)).send().await.unwrap();
    assert_eq!(response.status(), 200);
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["data"]["isSubscribed"], false);

    let response = bob.post(server.url(&unsubscribe)).send().await.unwrap();
    assert_eq!(response.status(), 400);
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["message"], "Channel not subscribed");

    let response = bob
        .post(server.url(&format!(
            "/api/v1/subscriptions/{}/subscribe",
            uuid::Uuid::new_v4()
        )))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_comments() {
    let server = TestServer::start().await;
    let (owner, _) = server.signed_in("carol").await;
    let (viewer, _) = server.signed_in("dave").await;
    let video = server.publish_video(&owner, "Talk", true).await;
    let path = format!("/api/v1/comments/{}", id(&video));

    let response = viewer
        .post(server.url(&path))
        .json(&json!({ "content": "   " }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    let mut comment_ids = Vec::new();
    for text in ["first", "second", "third"] {
        let response = viewer
            .post(server.url(&path))
            .json(&json!({ "content": text }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 201);
        let json: Value = response.json().await.unwrap();
        assert_eq!(json["data"]["owner"]["username"], "dave");
        comment_ids.push(id(&json["data"]));
    }

    let response = owner
        .get(server.url(&format!("{}?limit=2", path)))
        .send()
        .await
        .unwrap();
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["data"]["totalDocs"], 3);
    assert_eq!(json["data"]["docs"][0]["content"], "third");
    assert_eq!(json["data"]["docs"][0]["likesCount"], 0);
    assert_eq!(json["data"]["docs"].as_array().unwrap().len(), 2);

    let comment = format!("/api/v1/comments/c/{}", comment_ids[0]);

    let response = owner
        .patch(server.url(&comment))
        .json(&json!({ "content": "edited" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);

    let response = viewer
        .patch(server.url(&comment))
        .json(&json!({ "content": "edited" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["data"]["content"], "edited");

    let response = viewer.delete(server.url(&comment)).send().await.unwrap();
    assert_eq!(response.status(), 200);
    let response = viewer.delete(server.url(&comment)).send().await.unwrap();
    assert_eq!(response.status(), 404);

    let response = viewer
        .get(server.url(&format!("/api/v1/comments/{}", uuid::Uuid::new_v4())))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_likes() {
    let server = TestServer::start().await;
    let (owner, _) = server.signed_in("erin").await;
    let (fan, _) = server.signed_in("finn").await;
    let video = server.publish_video(&owner, "Likeable", true).await;
    let video_id = id(&video);

    let toggle = format!("/api/v1/likes/toggle/v/{}", video_id);
    let response = fan.post(server.url(&toggle)).send().await.unwrap();
    assert_eq!(response.status(), 200);
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["data"]["isLiked"], true);

    let response = fan
        .get(server.url(&format!("/api/v1/videos/{}", video_id)))
        .send()
        .await
        .unwrap();
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["data"]["likesCount"], 1);
    assert_eq!(json["data"]["isLiked"], true);

    let response = fan
        .get(server.url("/api/v1/likes/videos"))
        .send()
        .await
        .unwrap();
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["data"].as_array().unwrap().len(), 1);
    assert_eq!(json["data"][0]["_id"], video["_id"]);

    let response = fan.post(server.url(&toggle)).send().await.unwrap();
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["data"]["isLiked"], false);

    // Comment and tweet targets
    let response = owner
        .post(server.url(&format!("/api/v1/comments/{}", video_id)))
        .json(&json!({ "content": "pinned" }))
        .send()
        .await
        .unwrap();
    let json: Value = response.json().await.unwrap();
    let comment_id = id(&json["data"]);

    let response = fan
        .post(server.url(&format!("/api/v1/likes/toggle/c/{}", comment_id)))
        .send()
        .await
        .unwrap();
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["data"]["isLiked"], true);

    let response = fan
        .get(server.url(&format!("/api/v1/comments/{}", video_id)))
        .send()
        .await
        .unwrap();
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["data"]["docs"][0]["likesCount"], 1);
    assert_eq!(json["data"]["docs"][0]["isLiked"], true);

    for target in ["v", "c", "t"] {
        let response = fan
            .post(server.url(&format!(
                "/api/v1/likes/toggle/{}/{}",
                target,
                uuid::Uuid::new_v4()
            )))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 404, "target {}", target);
    }
}

#[tokio::test]
async fn test_playlists() {
    let server = TestServer::start().await;
    let (owner, owner_user) = server.signed_in("gina").await;
    let (other, _) = server.signed_in("hank").await;

    let public = server.publish_video(&owner, "Public", true).await;
    let draft = server.publish_video(&owner, "Draft", false).await;

    let response = owner
        .post(server.url("/api/v1/playlist"))
        .json(&json!({ "name": "" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    let response = owner
        .post(server.url("/api/v1/playlist"))
        .json(&json!({ "name": "Favourites", "description": "Best of" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);
    let json: Value = response.json().await.unwrap();
    let playlist_id = id(&json["data"]);
    assert_eq!(json["data"]["totalVideos"], 0);

    for video in [&public, &draft] {
        let response = owner
            .patch(server.url(&format!(
                "/api/v1/playlist/add/{}/{}",
                id(video),
                playlist_id
            )))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
    }

    // Duplicate
    let response = owner
        .patch(server.url(&format!(
            "/api/v1/playlist/add/{}/{}",
            id(&public),
            playlist_id
        )))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    // Someone else's playlist
    let response = other
        .patch(server.url(&format!(
            "/api/v1/playlist/remove/{}/{}",
            id(&public),
            playlist_id
        )))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);

    // Other users do not see the draft
    let response = other
        .get(server.url(&format!("/api/v1/playlist/{}", playlist_id)))
        .send()
        .await
        .unwrap();
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["data"]["videos"].as_array().unwrap().len(), 1);
    assert_eq!(json["data"]["videos"][0]["title"], "Public");

    let response = owner
        .get(server.url(&format!("/api/v1/playlist/{}", playlist_id)))
        .send()
        .await
        .unwrap();
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["data"]["videos"].as_array().unwrap().len(), 2);

    let response = other
        .get(server.url(&format!("/api/v1/playlist/user/{}", id(&owner_user))))
        .send()
        .await
        .unwrap();
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["data"][0]["name"], "Favourites");
    assert_eq!(json["data"][0]["totalVideos"], 2);

    let response = owner
        .patch(server.url(&format!(
            "/api/v1/playlist/remove/{}/{}",
            id(&draft),
            playlist_id
        )))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let response = owner
        .patch(server.url(&format!(
            "/api/v1/playlist/remove/{}/{}",
            id(&draft),
            playlist_id
        )))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    let path = format!("/api/v1/playlist/{}", playlist_id);
    let response = owner
        .patch(server.url(&path))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    let response = owner
        .patch(server.url(&path))
        .json(&json!({ "name": "Top picks" }))
        .send()
        .await
        .unwrap();
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["data"]["name"], "Top picks");
    assert_eq!(json["data"]["description"], "Best of");

    // Deleting a video drops it from playlists
    owner
        .delete(server.url(&format!("/api/v1/videos/{}", id(&public))))
        .send()
        .await
        .unwrap();
    let response = owner.get(server.url(&path)).send().await.unwrap();
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["data"]["totalVideos"], 0);

    let response = other.delete(server.url(&path)).send().await.unwrap();
    assert_eq!(response.status(), 403);
    let response = owner.delete(server.url(&path)).send().await.unwrap();
    assert_eq!(response.status(), 200);
    let response = owner.get(server.url(&path)).send().await.unwrap();
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_tweets() {
    let server = TestServer::start().await;
    let (author, author_user) = server.signed_in("iris").await;
    let (reader, _) = server.signed_in("jack").await;

    let response = author
        .post(server.url("/api/v1/tweets"))
        .json(&json!({ "content": "" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    let mut tweet_ids = Vec::new();
    for text in ["hello", "world"] {
        let response = author
            .post(server.url("/api/v1/tweets"))
            .json(&json!({ "content": text }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 201);
        let json: Value = response.json().await.unwrap();
        tweet_ids.push(id(&json["data"]));
    }

    reader
        .post(server.url(&format!("/api/v1/likes/toggle/t/{}", tweet_ids[0])))
        .send()
        .await
        .unwrap();

    let response = reader
        .get(server.url(&format!("/api/v1/tweets/user/{}", id(&author_user))))
        .send()
        .await
        .unwrap();
    let json: Value = response.json().await.unwrap();
    let tweets = json["data"].as_array().unwrap();
    assert_eq!(tweets.len(), 2);
    assert_eq!(tweets[0]["content"], "world");
    assert_eq!(tweets[1]["likesCount"], 1);
    assert_eq!(tweets[1]["isLiked"], true);
    assert_eq!(tweets[1]["owner"]["username"], "iris");

    let tweet = format!("/api/v1/tweets/{}", tweet_ids[0]);
    let response = reader
        .patch(server.url(&tweet))
        .json(&json!({ "content": "mine now" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);

    let response = author
        .patch(server.url(&tweet))
        .json(&json!({ "content": "hello again" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["data"]["content"], "hello again");
    assert_eq!(json["data"]["likesCount"], 1);

    let response = author.delete(server.url(&tweet)).send().await.unwrap();
    assert_eq!(response.status(), 200);

    let response = reader
        .post(server.url(&format!("/api/v1/likes/toggle/t/{}", tweet_ids[0])))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_dashboard() {
    let server = TestServer::start().await;
    let (creator, creator_user) = server.signed_in("kara").await;
    let (fan, _) = server.signed_in("liam").await;

    let first = server.publish_video(&creator, "One", true).await;
    server.publish_video(&creator, "Two", false).await;

    fan.get(server.url(&format!("/api/v1/videos/{}", id(&first))))
        .send()
        .await
        .unwrap();
    fan.post(server.url(&format!("/api/v1/likes/toggle/v/{}", id(&first))))
        .send()
        .await
        .unwrap();
    fan.post(server.url(&format!(
        "/api/v1/subscriptions/{}/subscribe",
        id(&creator_user)
    )))
    .send()
    .await
    .unwrap();
    creator
        .post(server.url("/api/v1/tweets"))
        .json(&json!({ "content": "new upload!" }))
        .send()
        .await
        .unwrap();

    let response = creator
        .get(server.url("/api/v1/dashboard/stats"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["data"]["totalVideos"], 2);
    assert_eq!(json["data"]["totalViews"], 1);
    assert_eq!(json["data"]["totalSubscribers"], 1);
    assert_eq!(json["data"]["totalLikes"], 1);
    assert_eq!(json["data"]["totalTweets"], 1);

    let response = creator
        .get(server.url("/api/v1/dashboard/videos"))
        .send()
        .await
        .unwrap();
    let json: Value = response.json().await.unwrap();
    let videos = json["data"].as_array().unwrap();
    assert_eq!(videos.len(), 2);
    assert_eq!(videos[0]["title"], "Two");
    assert_eq!(videos[1]["likesCount"], 1);
}

#[tokio::test]
async fn test_rate_limit_applies_to_login_only() {
    let server = TestServer::start_with(RateLimitConfig {
        enabled: true,
        requests_per_window: 2,
        window_seconds: 60,
        paths: vec!["/api/v1/users/login".to_string()],
        trust_proxy: false,
    })
    .await;
    let client = server.client();

    for _ in 0..2 {
        let response = client
            .post(server.url("/api/v1/users/login"))
            .json(&json!({ "username": "nobody", "password": "x" }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 404);
    }

    let response = client
        .post(server.url("/api/v1/users/login"))
        .json(&json!({ "username": "nobody", "password": "x" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 429);

    let response = client
        .get(server.url("/api/v1/healthcheck"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_rate_limit_ignores_spoofed_forwarded_for() {
    let server = TestServer::start_with(RateLimitConfig {
        enabled: true,
        requests_per_window: 1,
        window_seconds: 60,
        paths: vec!["/api/v1/users/login".to_string()],
        trust_proxy: false,
    })
    .await;
    let client = server.client();

    let mut statuses = Vec::new();
    for i in 0..3 {
        let response = client
            .post(server.url("/api/v1/users/login"))
            .header("x-forwarded-for", format!("198.51.100.{}", i + 1))
            .json(&json!({ "username": "nobody", "password": "x" }))
            .send()
            .await
            .unwrap();
        statuses.push(response.status().as_u16());
    }

    assert_eq!(statuses, vec![404, 429, 429]);
}

#[tokio::test]
async fn test_rate_limit_keys_on_forwarded_for_behind_proxy() {
    let server = TestServer::start_with(RateLimitConfig {
        enabled: true,
        requests_per_window: 1,
        window_seconds: 60,
        paths: vec!["/api/v1/users/login".to_string()],
        trust_proxy: true,
    })
    .await;
    let client = server.client();

    let login = |ip: &'static str| {
        client
            .post(server.url("/api/v1/users/login"))
            .header("x-forwarded-for", ip)
            .json(&json!({ "username": "nobody", "password": "x" }))
            .send()
    };

    assert_eq!(login("203.0.113.1").await.unwrap().status(), 404);
    assert_eq!(login("203.0.113.1").await.unwrap().status(), 429);
    assert_eq!(login("203.0.113.2").await.unwrap().status(), 404);
}
