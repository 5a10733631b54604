/* 📖 # Why a single unified API service?

TodoApiService is the only HttpService the server runs. It routes on method and
path itself, so the PAL never needs a routing table:

- `GET    /todo`        -> list all todos
- `POST   /todo`        -> create a todo
- `PUT    /todo`        -> update the todo named by the body's `Id`
- `GET    /todo/{id}`   -> fetch one todo
- `PUT    /todo/{id}`   -> update, with the id taken from the path
- `DELETE /todo/{id}`   -> delete

Everything the client can cause (unknown id, duplicate id, missing id, bad JSON,
unknown route) is answered with an `Ok` response carrying the right status.
Only failures of the service itself come back as `Err`, which the PAL turns
into HTTP 599.
*/

/* 📖 # Why are error bodies JSON strings?

Clients decode every response body as JSON, whatever the status. An error
message such as `could not find todo with id [999]` is therefore sent as the
JSON string `"could not find todo with id [999]"`, with the same
`application/json` content type as a successful response.
*/

use serde::Serialize;
use tracing::{debug, info, warn};

use todo_base::pal::http::{HttpMethod, HttpRequest, HttpResponse, HttpService, HttpStatusCode};
use todo_base::{ErrorKind, TodoError, TodoResult};

use crate::config::{ApiConfig, Config, MalformedBodyPolicy, UpdatePolicy};
use crate::store::{InMemoryStore, StoreHandle};
use crate::todo::Todo;

/// Resource path served by this service.
pub const TODO_PATH: &str = "/todo";
/// Body of a successful delete.
pub const DELETED_MESSAGE: &str = "Todo Deleted Successfully";

const COLLECTION_METHODS: &str = "GET, POST, PUT";
const ITEM_METHODS: &str = "GET, PUT, DELETE";

/// Parsed request target.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Route {
    /// `/todo`
    Collection,
    /// `/todo/{id}`, id percent-decoded
    Item(String),
}

impl Route {
    /// Parse a path without query string. Trailing slashes are ignored.
    fn parse(path: &str) -> Option<Self> {
        let path = path.trim_end_matches('/');
        let rest = path.strip_prefix(TODO_PATH)?;
        if rest.is_empty() {
            return Some(Route::Collection);
        }

        let id = rest.strip_prefix('/')?;
        if id.contains('/') {
            return None;
        }
        let id = urlencoding::decode(id).ok()?;
        Some(Route::Item(id.into_owned()))
    }
}

/// HTTP request handler for the todo resource.
#[derive(Clone)]
pub struct TodoApiService {
    store: StoreHandle,
    config: ApiConfig,
}

impl TodoApiService {
    /// Create a service operating on `store`.
    ///
    /// # Examples
    /// ```
    /// use todo_engine::{ApiConfig, InMemoryStore, StoreHandle, TodoApiService};
    ///
    /// let store = StoreHandle::new(InMemoryStore::new());
    /// let service = TodoApiService::new(store, ApiConfig::default());
    /// ```
    pub fn new(store: StoreHandle, config: ApiConfig) -> Self {
        Self { store, config }
    }

    /// Build a service with a fresh in-memory store seeded from `config`.
    pub fn from_config(config: &Config) -> TodoResult<Self> {
        let store = InMemoryStore::with_todos(config.seed.iter().cloned())?;
        Ok(Self::new(StoreHandle::new(store), config.api))
    }

    /// The store this service reads and writes.
    pub fn store(&self) -> &StoreHandle {
        &self.store
    }

    fn json_response<T: Serialize + ?Sized>(
        status: HttpStatusCode,
        data: &T,
    ) -> TodoResult<HttpResponse> {
        serde_json::to_string(data)
            .map(|json| HttpResponse::json(status, json))
            .map_err(|e| todo_base::err!("JSON serialization error: {}", e))
    }

    /// Map a store error to its HTTP response. Errors that are not the
    /// client's doing are passed through.
    fn error_response(error: Box<TodoError>) -> TodoResult<HttpResponse> {
        let status = match error.kind() {
            ErrorKind::Validation { .. } => HttpStatusCode::BadRequest,
            ErrorKind::Conflict { .. } => HttpStatusCode::Conflict,
            ErrorKind::NotFound { .. } => HttpStatusCode::NotFound,
            ErrorKind::FileError { .. } | ErrorKind::Message { .. } => return Err(error),
        };
        warn!(status = status.as_u16(), error = %error, "request rejected");
        Self::json_response(status, &error.kind().to_string())
    }

    fn respond<T: Serialize>(
        status: HttpStatusCode,
        result: TodoResult<T>,
    ) -> TodoResult<HttpResponse> {
        match result {
            Ok(value) => Self::json_response(status, &value),
            Err(e) => Self::error_response(e),
        }
    }

    /// Decode the request body, or `None` if it is not a JSON todo.
    fn parse_body(request: &HttpRequest) -> Option<Todo> {
        match serde_json::from_slice(request.body().as_bytes()) {
            Ok(todo) => Some(todo),
            Err(e) => {
                warn!(error = %e, "error deserializing the request body");
                None
            }
        }
    }

    fn malformed_body_response(&self) -> TodoResult<HttpResponse> {
        let (status, message) = match self.config.malformed_body {
            MalformedBodyPolicy::BadRequest => (HttpStatusCode::BadRequest, "Bad Request"),
            MalformedBodyPolicy::InternalError => (
                HttpStatusCode::InternalServerError,
                "Internal Server Error",
            ),
        };
        Self::json_response(status, message)
    }

    fn list_todos(&self) -> TodoResult<HttpResponse> {
        info!("Endpoint hit: list_todos");
        let todos = self.store.list_all()?;
        debug!(count = todos.len(), "listing todos");
        Self::json_response(HttpStatusCode::Ok, &todos)
    }

    fn get_todo(&self, id: &str) -> TodoResult<HttpResponse> {
        info!(id, "Endpoint hit: get_todo");
        Self::respond(HttpStatusCode::Ok, self.store.get_by_id(id))
    }

    fn create_todo(&self, request: &HttpRequest) -> TodoResult<HttpResponse> {
        info!("Endpoint hit: create_todo");
        let Some(todo) = Self::parse_body(request) else {
            return self.malformed_body_response();
        };
        Self::respond(HttpStatusCode::Created, self.store.create(todo))
    }

    fn update_todo(&self, request: &HttpRequest, path_id: Option<&str>) -> TodoResult<HttpResponse> {
        info!(path_id, "Endpoint hit: update_todo");
        let Some(mut todo) = Self::parse_body(request) else {
            return self.malformed_body_response();
        };

        if let Some(path_id) = path_id {
            if todo.id.is_empty() {
                todo.id = path_id.to_string();
            } else if todo.id != path_id {
                warn!(body_id = %todo.id, path_id, "todo id does not match path");
                return Self::json_response(
                    HttpStatusCode::BadRequest,
                    &format!(
                        "todo Id [{}] does not match path id [{}]",
                        todo.id, path_id
                    ),
                );
            }
        }

        match self.config.update_policy {
            UpdatePolicy::Strict => Self::respond(HttpStatusCode::Ok, self.store.update(todo)),
            UpdatePolicy::Upsert => match self.store.update_or_create(todo) {
                Ok((created, true)) => {
                    info!(id = %created.id, "todo not found, created instead");
                    Self::json_response(HttpStatusCode::Created, &created)
                }
                Ok((updated, false)) => Self::json_response(HttpStatusCode::Ok, &updated),
                Err(e) => Self::error_response(e),
            },
        }
    }

    fn delete_todo(&self, id: &str) -> TodoResult<HttpResponse> {
        info!(id, "Endpoint hit: delete_todo");
        let removed = self.store.delete(id)?;
        debug!(id, removed = removed.is_some(), "delete finished");
        Self::json_response(HttpStatusCode::Ok, DELETED_MESSAGE)
    }

    fn method_not_allowed(method: &HttpMethod, allowed: &str) -> TodoResult<HttpResponse> {
        Ok(Self::json_response(
            HttpStatusCode::MethodNotAllowed,
            &format!("method {} not allowed", method),
        )?
        .with_header("Allow", allowed))
    }
}

impl std::fmt::Debug for TodoApiService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TodoApiService")
            .field("config", &self.config)
            .finish()
    }
}

impl HttpService for TodoApiService {
    fn handle_request(&self, request: HttpRequest) -> TodoResult<HttpResponse> {
        // Remove query parameters from path
        let path = request.path().split('?').next().unwrap_or(request.path());
        debug!(method = %request.method(), path, "routing request");

        let Some(route) = Route::parse(path) else {
            return Self::json_response(HttpStatusCode::NotFound, &format!("no route for {}", path));
        };

        match (request.method(), route) {
            (HttpMethod::Get, Route::Collection) => self.list_todos(),
            (HttpMethod::Post, Route::Collection) => self.create_todo(&request),
            (HttpMethod::Put, Route::Collection) => self.update_todo(&request, None),
            (HttpMethod::Get, Route::Item(id)) => self.get_todo(&id),
            (HttpMethod::Put, Route::Item(id)) => self.update_todo(&request, Some(&id)),
            (HttpMethod::Delete, Route::Item(id)) => self.delete_todo(&id),
            (method, Route::Collection) => Self::method_not_allowed(method, COLLECTION_METHODS),
            (method, Route::Item(_)) => Self::method_not_allowed(method, ITEM_METHODS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::TodoStore;
    use expect_test::expect;

    fn service_with(config: ApiConfig, todos: Vec<Todo>) -> TodoApiService {
        let store = StoreHandle::new(InMemoryStore::with_todos(todos).unwrap());
        TodoApiService::new(store, config)
    }

    fn default_service() -> TodoApiService {
        service_with(ApiConfig::default(), vec![])
    }

    fn bake_cake() -> Todo {
        Todo::new("1", "Bake cake", "Bake a carrot cake", false)
    }

    fn call(service: &TodoApiService, method: HttpMethod, path: &str, body: &str) -> HttpResponse {
        service
            .handle_request(HttpRequest::new(method, path).with_body(body))
            .unwrap()
    }

    fn body(response: &HttpResponse) -> String {
        response.body().as_string().unwrap()
    }

    #[test]
    fn test_route_parse() {
        assert_eq!(Route::parse("/todo"), Some(Route::Collection));
        assert_eq!(Route::parse("/todo/"), Some(Route::Collection));
        assert_eq!(Route::parse("/todo/42"), Some(Route::Item("42".to_string())));
        assert_eq!(Route::parse("/todo/42/"), Some(Route::Item("42".to_string())));
        assert_eq!(
            Route::parse("/todo/a%20b"),
            Some(Route::Item("a b".to_string()))
        );
        assert_eq!(Route::parse("/todos"), None);
        assert_eq!(Route::parse("/todo/1/2"), None);
        assert_eq!(Route::parse("/"), None);
    }

    #[test]
    fn test_list_empty_is_empty_array() {
        let response = call(&default_service(), HttpMethod::Get, "/todo", "");
        assert_eq!(response.status(), HttpStatusCode::Ok);
        assert_eq!(
            response.headers().get("Content-Type"),
            Some(&"application/json".to_string())
        );
        assert_eq!(body(&response), "[]");
    }

    #[test]
    fn test_list_in_insertion_order() {
        let service = service_with(
            ApiConfig::default(),
            vec![
                Todo::new("2", "Iron shirts", "", false),
                Todo::new("1", "Bake cake", "", true),
            ],
        );
        let response = call(&service, HttpMethod::Get, "/todo?verbose=1", "");
        expect![[r#"[{"Id":"2","Title":"Iron shirts","Desc":"","Completed":false},{"Id":"1","Title":"Bake cake","Desc":"","Completed":true}]"#]]
            .assert_eq(&body(&response));
    }

    #[test]
    fn test_create_returns_201_with_item() {
        let service = default_service();
        let json = serde_json::to_string(&bake_cake()).unwrap();

        let response = call(&service, HttpMethod::Post, "/todo", &json);
        assert_eq!(response.status(), HttpStatusCode::Created);
        assert_eq!(body(&response), json);
        assert_eq!(service.store().get_by_id("1").unwrap(), bake_cake());
    }

    #[test]
    fn test_create_duplicate_is_409() {
        let service = service_with(ApiConfig::default(), vec![bake_cake()]);
        let response = call(&service, HttpMethod::Post, "/todo", r#"{"Id":"1","Title":"Other"}"#);

        assert_eq!(response.status(), HttpStatusCode::Conflict);
        expect![[r#""Todo with id [1] already exists""#]].assert_eq(&body(&response));
        assert_eq!(service.store().get_by_id("1").unwrap().title, "Bake cake");
    }

    #[test]
    fn test_create_without_id_is_400() {
        let service = default_service();
        let response = call(&service, HttpMethod::Post, "/todo", r#"{"Title":"No id"}"#);

        assert_eq!(response.status(), HttpStatusCode::BadRequest);
        expect![[r#""todo Id cannot be null""#]].assert_eq(&body(&response));
        assert!(service.store().is_empty().unwrap());
    }

    #[test]
    fn test_malformed_body_default_is_400() {
        let service = default_service();
        let response = call(&service, HttpMethod::Post, "/todo", "{not json");

        assert_eq!(response.status(), HttpStatusCode::BadRequest);
        assert_eq!(body(&response), r#""Bad Request""#);
    }

    #[test]
    fn test_malformed_body_legacy_is_500() {
        let config = ApiConfig {
            malformed_body: MalformedBodyPolicy::InternalError,
            ..ApiConfig::default()
        };
        let service = service_with(config, vec![]);

        for method in [HttpMethod::Post, HttpMethod::Put] {
            let response = call(&service, method, "/todo", r#"{"Id": 1"#);
            assert_eq!(response.status(), HttpStatusCode::InternalServerError);
            assert_eq!(body(&response), r#""Internal Server Error""#);
        }
        assert!(service.store().is_empty().unwrap());
    }

    #[test]
    fn test_get_by_id() {
        let service = service_with(ApiConfig::default(), vec![bake_cake()]);

        let response = call(&service, HttpMethod::Get, "/todo/1", "");
        assert_eq!(response.status(), HttpStatusCode::Ok);
        let fetched: Todo = serde_json::from_str(&body(&response)).unwrap();
        assert_eq!(fetched, bake_cake());
    }

    #[test]
    fn test_get_missing_is_404() {
        let response = call(&default_service(), HttpMethod::Get, "/todo/999", "");
        assert_eq!(response.status(), HttpStatusCode::NotFound);
        expect![[r#""could not find todo with id [999]""#]].assert_eq(&body(&response));
    }

    #[test]
    fn test_update_strict() {
        let service = service_with(ApiConfig::default(), vec![bake_cake()]);

        let response = call(
            &service,
            HttpMethod::Put,
            "/todo",
            r#"{"Id":"1","Title":"Bake bread","Desc":"","Completed":true}"#,
        );
        assert_eq!(response.status(), HttpStatusCode::Ok);
        assert_eq!(
            service.store().get_by_id("1").unwrap(),
            Todo::new("1", "Bake bread", "", true)
        );

        let response = call(&service, HttpMethod::Put, "/todo", r#"{"Id":"2"}"#);
        assert_eq!(response.status(), HttpStatusCode::NotFound);
        expect![[r#""could not find todo with id [2]""#]].assert_eq(&body(&response));
        assert_eq!(service.store().len().unwrap(), 1);
    }

    #[test]
    fn test_update_upsert_creates_missing() {
        let config = ApiConfig {
            update_policy: UpdatePolicy::Upsert,
            ..ApiConfig::default()
        };
        let service = service_with(config, vec![bake_cake()]);

        let response = call(&service, HttpMethod::Put, "/todo", r#"{"Id":"2","Title":"Walk dog"}"#);
        assert_eq!(response.status(), HttpStatusCode::Created);
        assert_eq!(service.store().len().unwrap(), 2);

        let response = call(&service, HttpMethod::Put, "/todo", r#"{"Id":"2","Title":"Walk cat"}"#);
        assert_eq!(response.status(), HttpStatusCode::Ok);
        assert_eq!(service.store().get_by_id("2").unwrap().title, "Walk cat");
    }

    #[test]
    fn test_update_with_path_id() {
        let service = service_with(ApiConfig::default(), vec![bake_cake()]);

        let response = call(&service, HttpMethod::Put, "/todo/1", r#"{"Title":"From path"}"#);
        assert_eq!(response.status(), HttpStatusCode::Ok);
        assert_eq!(service.store().get_by_id("1").unwrap().title, "From path");

        let response = call(&service, HttpMethod::Put, "/todo/1", r#"{"Id":"3"}"#);
        assert_eq!(response.status(), HttpStatusCode::BadRequest);
        expect![[r#""todo Id [3] does not match path id [1]""#]].assert_eq(&body(&response));
    }

    #[test]
    fn test_update_without_id_is_400() {
        let service = service_with(ApiConfig::default(), vec![bake_cake()]);
        let response = call(&service, HttpMethod::Put, "/todo", r#"{"Title":"x"}"#);
        assert_eq!(response.status(), HttpStatusCode::BadRequest);
    }

    #[test]
    fn test_delete_present_and_absent() {
        let service = service_with(ApiConfig::default(), vec![bake_cake()]);

        for _ in 0..2 {
            let response = call(&service, HttpMethod::Delete, "/todo/1", "");
            assert_eq!(response.status(), HttpStatusCode::Ok);
            expect![[r#""Todo Deleted Successfully""#]].assert_eq(&body(&response));
        }
        assert!(service.store().is_empty().unwrap());
    }

    #[test]
    fn test_unknown_route_is_404() {
        let response = call(&default_service(), HttpMethod::Get, "/api/other", "");
        assert_eq!(response.status(), HttpStatusCode::NotFound);
        expect![[r#""no route for /api/other""#]].assert_eq(&body(&response));
    }

    #[test]
    fn test_wrong_method_is_405_with_allow() {
        let service = default_service();

        let response = call(&service, HttpMethod::Delete, "/todo", "");
        assert_eq!(response.status(), HttpStatusCode::MethodNotAllowed);
        assert_eq!(
            response.headers().get("Allow"),
            Some(&"GET, POST, PUT".to_string())
        );

        let response = call(&service, HttpMethod::Post, "/todo/1", "{}");
        assert_eq!(response.status(), HttpStatusCode::MethodNotAllowed);
        assert_eq!(
            response.headers().get("Allow"),
            Some(&"GET, PUT, DELETE".to_string())
        );

        let response = call(&service, HttpMethod::Other("PATCH".to_string()), "/todo", "{}");
        assert_eq!(response.status(), HttpStatusCode::MethodNotAllowed);
        assert_eq!(
            response.headers().get("Content-Type"),
            Some(&"application/json".to_string())
        );
        expect![[r#""method PATCH not allowed""#]].assert_eq(&body(&response));
    }

    #[test]
    fn test_from_config_seeds_store() {
        let config = Config {
            seed: vec![bake_cake()],
            ..Config::default()
        };
        let service = TodoApiService::from_config(&config).unwrap();
        assert_eq!(service.store().list_all().unwrap(), vec![bake_cake()]);
    }

    /// Store double whose every operation fails with an internal error.
    struct BrokenStore;

    impl TodoStore for BrokenStore {
        fn list_all(&self) -> TodoResult<Vec<Todo>> {
            Err(Box::new(TodoError::message("disk on fire")))
        }

        fn get_by_id(&self, _id: &str) -> TodoResult<Todo> {
            Err(Box::new(TodoError::message("disk on fire")))
        }

        fn create(&mut self, _todo: Todo) -> TodoResult<Todo> {
            Err(Box::new(TodoError::message("disk on fire")))
        }

        fn update(&mut self, _todo: Todo) -> TodoResult<Todo> {
            Err(Box::new(TodoError::message("disk on fire")))
        }

        fn delete(&mut self, _id: &str) -> TodoResult<Option<Todo>> {
            Err(Box::new(TodoError::message("disk on fire")))
        }

        fn len(&self) -> TodoResult<usize> {
            Ok(0)
        }
    }

    #[test]
    fn test_internal_store_errors_are_propagated() {
        let service = TodoApiService::new(StoreHandle::new(BrokenStore), ApiConfig::default());

        let requests = [
            HttpRequest::new(HttpMethod::Get, "/todo"),
            HttpRequest::new(HttpMethod::Get, "/todo/1"),
            HttpRequest::new(HttpMethod::Post, "/todo").with_body(r#"{"Id":"1"}"#),
            HttpRequest::new(HttpMethod::Put, "/todo").with_body(r#"{"Id":"1"}"#),
            HttpRequest::new(HttpMethod::Delete, "/todo/1"),
        ];
        for request in requests {
            let error = service.handle_request(request).unwrap_err();
            assert_eq!(error.to_string(), "disk on fire");
        }
    }

    /// Store double that answers lookups from a fixed list and records nothing.
    struct FixedStore(Vec<Todo>);

    impl TodoStore for FixedStore {
        fn list_all(&self) -> TodoResult<Vec<Todo>> {
            Ok(self.0.clone())
        }

        fn get_by_id(&self, id: &str) -> TodoResult<Todo> {
            self.0
                .iter()
                .find(|todo| todo.id == id)
                .cloned()
                .ok_or_else(|| Box::new(TodoError::not_found(id)))
        }

        fn create(&mut self, _todo: Todo) -> TodoResult<Todo> {
            Err(Box::new(TodoError::conflict("fixed")))
        }

        fn update(&mut self, todo: Todo) -> TodoResult<Todo> {
            Ok(todo)
        }

        fn delete(&mut self, _id: &str) -> TodoResult<Option<Todo>> {
            Ok(None)
        }

        fn len(&self) -> TodoResult<usize> {
            Ok(self.0.len())
        }
    }

    #[test]
    fn test_handler_maps_whatever_the_store_returns() {
        let store = StoreHandle::new(FixedStore(vec![bake_cake()]));
        let service = TodoApiService::new(store, ApiConfig::default());

        let response = call(&service, HttpMethod::Get, "/todo/1", "");
        assert_eq!(response.status(), HttpStatusCode::Ok);

        let response = call(&service, HttpMethod::Post, "/todo", r#"{"Id":"9"}"#);
        assert_eq!(response.status(), HttpStatusCode::Conflict);
        expect![[r#""Todo with id [fixed] already exists""#]].assert_eq(&body(&response));
    }
}
