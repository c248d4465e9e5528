use crate::helpers::spawn_app;

#[tokio::test]
async fn health_check_works() {
    // Arrange
    let app = spawn_app().await;

    // Act
    let response = app.get("/health_check", None).await;

    // Assert
    assert!(response.status().is_success());
    assert_eq!(Some(0), response.content_length());
}

#[tokio::test]
async fn unknown_routes_return_a_json_404() {
    // Arrange
    let app = spawn_app().await;

    // Act
    let response = app.get("/does-not-exist", None).await;

    // Assert
    assert_eq!(response.status().as_u16(), 404);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Route not found - /does-not-exist");
}

#[tokio::test]
async fn unknown_auth_routes_return_404_for_anonymous_users() {
    // Arrange
    let app = spawn_app().await;

    // Act
    let response = app
        .post("/auth/nope", None, &serde_json::json!({}))
        .await;

    // Assert
    assert_eq!(response.status().as_u16(), 404);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Route not found - /auth/nope");
}
