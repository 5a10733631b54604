/* 📖 # PAL consistency tests

The engine only sees `dyn Pal`. These tests run the same assertions against
MockPal and RealPal so a test that passes on the mock says something about
production behaviour too.
*/

#[cfg(test)]
mod pal_trait_tests {
    use crate::pal::http::{
        HttpMethod, HttpRequest, HttpResponse, HttpServerConfig, HttpService, HttpStatusCode,
    };
    use crate::pal::{FilePath, MockPal, Pal, PalHandle, RealPal};
    use crate::{ErrorKind, TodoResult};

    #[derive(Debug)]
    struct OkService;

    impl HttpService for OkService {
        fn handle_request(&self, _request: HttpRequest) -> TodoResult<HttpResponse> {
            Ok(HttpResponse::json(HttpStatusCode::Ok, "[]"))
        }
    }

    fn assert_missing_file_behaviour(pal: &dyn Pal) {
        let path = FilePath::from("does-not-exist.toml");
        assert!(!pal.file_exists(&path).unwrap());

        let error = pal.read_file_to_string(&path).unwrap_err();
        assert!(matches!(error.kind(), ErrorKind::FileError { .. }));
        assert!(error.to_string().contains("does-not-exist.toml"));
    }

    #[test]
    fn test_missing_file_mock() {
        assert_missing_file_behaviour(&MockPal::new());
    }

    #[test]
    fn test_missing_file_real() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        assert_missing_file_behaviour(&RealPal::new(temp_dir.path().to_path_buf()));
    }

    #[test]
    fn test_invalid_utf8_is_rejected() {
        let mock = MockPal::new();
        mock.add_file(FilePath::from("bad.toml"), vec![0xFF, 0xFE]);

        let error = mock
            .read_file_to_string(&FilePath::from("bad.toml"))
            .unwrap_err();
        assert_eq!(error.to_string(), "File is not valid UTF-8: bad.toml");
    }

    #[test]
    fn test_pal_handle_deref() {
        let mock = MockPal::new();
        mock.add_file(FilePath::from("todo.toml"), b"".to_vec());

        let handle = PalHandle::new(mock);
        let clone = handle.clone();
        assert!(clone.file_exists(&FilePath::from("todo.toml")).unwrap());
    }

    #[test]
    fn test_start_http_server_through_handle() {
        let mock = MockPal::new();
        let handle = PalHandle::new(mock.clone());

        let server = handle
            .start_http_server(Box::new(OkService), HttpServerConfig::default())
            .unwrap();
        let response = mock
            .simulate_request(server.port(), HttpRequest::new(HttpMethod::Get, "/todo"))
            .unwrap();
        assert_eq!(response.status(), HttpStatusCode::Ok);
    }
}
