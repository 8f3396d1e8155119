#![allow(dead_code)]

use apiforge::ai::{Completion, CompletionRequest, LanguageModel, ProviderError};
use apiforge::spec::{ApiSpec, AuthMethod, Database, Endpoint, Framework, HttpMethod, Parameter};
use async_trait::async_trait;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// A language model that replays canned answers and records every request.
///
/// Once the script runs out every call fails with `EmptyResponse`.
pub struct ScriptedModel {
    script: Mutex<VecDeque<Result<String, ProviderError>>>,
    requests: Mutex<Vec<CompletionRequest>>,
    delay: Option<Duration>,
}

impl ScriptedModel {
    pub fn new(script: impl IntoIterator<Item = Result<String, ProviderError>>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    pub fn answering<S: Into<String>>(answers: impl IntoIterator<Item = S>) -> Self {
        Self::new(answers.into_iter().map(|a| Ok(a.into())))
    }

    /// Sleeps before every answer; pair with a paused tokio clock.
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn prompt(&self, index: usize) -> String {
        self.requests()[index].prompt.clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<Completion, ProviderError> {
        self.requests.lock().unwrap().push(request);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or(Err(ProviderError::EmptyResponse))
            .map(Completion::new)
    }
}

/// The four-endpoint User Management API used across the suite.
pub fn user_management() -> ApiSpec {
    ApiSpec::new(
        "User Management API",
        "REST API for user registration, authentication and profile management",
    )
    .with_stack(Framework::FastApi, Database::Postgresql, AuthMethod::Jwt)
    .with_endpoint(
        Endpoint::new(HttpMethod::Post, "/api/auth/register", "Register a new user")
            .with_request_example(json!({"username": "testuser", "email": "test@example.com", "password": "password123"}))
            .with_tags(["authentication"]),
    )
    .with_endpoint(
        Endpoint::new(HttpMethod::Post, "/api/auth/login", "Log a user in")
            .with_request_example(json!({"username": "testuser", "password": "password123"}))
            .with_response_example(json!({"access_token": "jwt_token_here", "token_type": "bearer"}))
            .with_tags(["authentication"]),
    )
    .with_endpoint(
        Endpoint::new(HttpMethod::Get, "/api/users", "List users")
            .with_parameter(Parameter::query("page", false))
            .with_parameter(Parameter::query("limit", false))
            .with_tags(["users"]),
    )
    .with_endpoint(
        Endpoint::new(HttpMethod::Get, "/api/users/{user_id}", "Fetch a single user")
            .with_parameter(Parameter::path("user_id"))
            .with_response_example(json!({"success": true, "data": {"id": 1, "username": "testuser"}}))
            .with_tags(["users"]),
    )
}

/// A minimal extraction answer in the requested shape.
pub fn extraction_answer() -> serde_json::Value {
    json!({
        "name": "Library API",
        "description": "Lends books to members",
        "framework": "flask",
        "database": "postgres",
        "auth_method": "api_key",
        "endpoints": [
            {
                "path": "/api/books",
                "method": "GET",
                "description": "List books",
                "parameters": [{"name": "author", "location": "query", "required": false}],
                "response_example": {"success": true, "data": []},
                "tags": ["books"]
            },
            {
                "path": "/api/books/{book_id}/loans",
                "method": "POST",
                "description": "Lend a book",
                "parameters": [{"name": "book_id", "location": "path", "required": true}],
                "request_body_example": {"member_id": 7}
            }
        ],
        "reasoning": "Books and loans are the core resources",
        "suggestions": ["Add reservations"],
        "confidence_score": 0.9
    })
}
