use std::fs;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::thread::{self, JoinHandle};

use assert_matches::assert_matches;
use cnpj_enricher::cnpj_ws::{CnpjWsHttpClient, LookupClient, build_url, extract_record};
use cnpj_enricher::domain::Cnpj;
use cnpj_enricher::error::EnrichError;

const FIXTURE: &str = "tests/fixtures/cnpj_ws_11222333000144.json";

/// Serves exactly one HTTP response on a loopback port and returns the URL
/// template pointing at it.
fn serve_once(status_line: &'static str, body: String) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|window| window == b"\r\n\r\n") {
            let read = stream.read(&mut buf).unwrap();
            if read == 0 {
                break;
            }
            request.extend_from_slice(&buf[..read]);
        }
        let response = if body.is_empty() {
            format!("HTTP/1.1 {status_line}\r\nConnection: close\r\n\r\n")
        } else {
            format!(
                "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            )
        };
        stream.write_all(response.as_bytes()).unwrap();
        stream.flush().unwrap();
        String::from_utf8_lossy(&request).into_owned()
    });
    (format!("http://127.0.0.1:{port}/cnpj/{{cnpj}}"), handle)
}

fn fixture_body() -> String {
    fs::read_to_string(FIXTURE).unwrap()
}

#[test]
fn extract_record_from_fixture() {
    let raw = fixture_body();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    let cnpj = Cnpj::normalized("11.222.333/0001-44");
    let record = extract_record(&cnpj, &value);

    assert_eq!(record.cnpj, "11222333000144");
    assert_eq!(record.state_registration, "110042490114");
    assert_eq!(record.legal_name, "EXEMPLO COMERCIO DE ALIMENTOS LTDA");
    assert_eq!(record.alternate_name, "EXEMPLO ALIMENTOS");
    assert_eq!(record.trade_name, "MERCADINHO EXEMPLO");
    assert_eq!(record.street, "DAS FLORES");
    assert_eq!(record.postal_code, "01001000");
    assert_eq!(record.state, "SP");
}

#[test]
fn missing_establishment_degrades_to_empty_fields() {
    let value = serde_json::json!({ "razao_social": "ACME SA" });
    let record = extract_record(&Cnpj::normalized("11222333000144"), &value);

    assert_eq!(record.legal_name, "ACME SA");
    assert_eq!(record.alternate_name, "");
    assert_eq!(record.trade_name, "");
    assert_eq!(record.state_registration, "");
    assert_eq!(record.state, "");
}

#[test]
fn null_and_empty_list_fields_are_empty() {
    let value = serde_json::json!({
        "razao_social": "ACME SA",
        "nome": null,
        "estabelecimento": {
            "nome_fantasia": null,
            "estado": null,
            "inscricoes_estaduais": []
        }
    });
    let record = extract_record(&Cnpj::normalized("11222333000144"), &value);

    assert_eq!(record.alternate_name, "");
    assert_eq!(record.trade_name, "");
    assert_eq!(record.state, "");
    assert_eq!(record.state_registration, "");
}

#[test]
fn url_template_substitution() {
    let cnpj = Cnpj::normalized("11222333000144");
    assert_eq!(
        build_url("http://localhost:8080/v1/{cnpj}?full=1", &cnpj),
        "http://localhost:8080/v1/11222333000144?full=1"
    );
}

#[test]
fn fetch_ok_returns_record() {
    let (template, server) = serve_once("200 OK", fixture_body());
    let client = CnpjWsHttpClient::new(&template, None).unwrap();

    let record = client
        .fetch(&Cnpj::normalized("11.222.333/0001-44"))
        .unwrap();

    let request = server.join().unwrap();
    assert!(request.starts_with("GET /cnpj/11222333000144 "));
    assert_matches!(record, Some(record) if record.legal_name == "EXEMPLO COMERCIO DE ALIMENTOS LTDA");
}

#[test]
fn fetch_not_found_is_absent() {
    let (template, server) = serve_once("404 Not Found", r#"{"status":404}"#.to_string());
    let client = CnpjWsHttpClient::new(&template, None).unwrap();

    let record = client.fetch(&Cnpj::normalized("99999999000199")).unwrap();

    server.join().unwrap();
    assert_matches!(record, None);
}

#[test]
fn fetch_other_success_status_is_absent() {
    let (template, server) = serve_once("203 Non-Authoritative Information", fixture_body());
    let client = CnpjWsHttpClient::new(&template, None).unwrap();

    let record = client.fetch(&Cnpj::normalized("11222333000144")).unwrap();

    server.join().unwrap();
    assert_matches!(record, None);
}

#[test]
fn fetch_no_content_is_absent() {
    let (template, server) = serve_once("204 No Content", String::new());
    let client = CnpjWsHttpClient::new(&template, None).unwrap();

    let record = client.fetch(&Cnpj::normalized("11222333000144")).unwrap();

    server.join().unwrap();
    assert_matches!(record, None);
}

#[test]
fn fetch_non_json_body_is_decode_error() {
    let (template, server) = serve_once("200 OK", "<html>rate limited</html>".to_string());
    let client = CnpjWsHttpClient::new(&template, None).unwrap();

    let err = client
        .fetch(&Cnpj::normalized("11222333000144"))
        .unwrap_err();

    server.join().unwrap();
    assert_matches!(err, EnrichError::LookupDecode(_));
}

#[test]
fn fetch_connection_refused_is_http_error() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    let template = format!("http://127.0.0.1:{port}/cnpj/{{cnpj}}");
    let client = CnpjWsHttpClient::new(&template, None).unwrap();

    let err = client
        .fetch(&Cnpj::normalized("11222333000144"))
        .unwrap_err();

    assert_matches!(err, EnrichError::LookupHttp(_));
}
