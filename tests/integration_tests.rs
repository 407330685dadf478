use httpmock::prelude::*;
use std::io::Read;
use strategy_etl::core::dataset::DEFAULT_CACHE_KEY;
use strategy_etl::{CliConfig, EtlEngine, EtlError, LocalStorage, StrategyPipeline};
use tempfile::TempDir;

const COLLECTIONS_CSV: &str = "\u{feff}idListaCobro,TipoEnvio,BancoSimplificado,montoCobrar,montoCobrado,CobroExitoso,idRespuestaBanco\n\
1001,ACH,BBVA,15000,15000,true,OK\n\
1002,ACH,BBVA,5000,0,false,ERROR_FONDOS\n\
1003,TEF,Banamex,12000,0,false,CUENTA_BLOQUEADA\n\
1004,TEF,Banamex,8000,8000,\"true\",\"EXITOSO\"\n";

fn config_for(output_path: &str, source: Option<String>) -> CliConfig {
    CliConfig {
        source,
        output_path: output_path.to_string(),
        cache_key: DEFAULT_CACHE_KEY.to_string(),
        no_cache: false,
        refresh: false,
        no_sample_fallback: true,
        average_decimals: 2,
        output_formats: vec!["csv".to_string(), "tsv".to_string(), "json".to_string()],
        timeout_seconds: Some(5),
        verbose: false,
        monitor: false,
    }
}

fn read_archive(path: &std::path::Path) -> zip::ZipArchive<std::io::Cursor<Vec<u8>>> {
    let zip_data = std::fs::read(path).unwrap();
    zip::ZipArchive::new(std::io::Cursor::new(zip_data)).unwrap()
}

fn read_entry(archive: &mut zip::ZipArchive<std::io::Cursor<Vec<u8>>>, name: &str) -> String {
    let mut file = archive.by_name(name).unwrap();
    let mut content = String::new();
    file.read_to_string(&mut content).unwrap();
    content
}

#[tokio::test]
async fn test_end_to_end_from_csv_file() {
    let temp_dir = TempDir::new().unwrap();
    let output_path = temp_dir.path().join("out").to_str().unwrap().to_string();
    let csv_path = temp_dir.path().join("pruebaDatos.csv");
    std::fs::write(&csv_path, COLLECTIONS_CSV).unwrap();

    let config = config_for(&output_path, Some(csv_path.to_str().unwrap().to_string()));
    let storage = LocalStorage::new(output_path.clone());
    let engine = EtlEngine::new_with_monitoring(StrategyPipeline::new(storage, config), false);

    let result = engine.run().await.unwrap();
    assert!(result.ends_with("strategy_report.zip"));

    let archive_path = std::path::Path::new(&output_path).join("strategy_report.zip");
    assert!(archive_path.exists());

    let mut archive = read_archive(&archive_path);
    assert_eq!(archive.len(), 3);

    let csv_content = read_entry(&mut archive, "strategies.csv");
    let lines: Vec<&str> = csv_content.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("id,name,tipoEnvio,banco,records"));
    assert_eq!(
        lines[1],
        "ACH_BBVA,ACH - BBVA,ACH,BBVA,2,20000.00,15000.00,1,50.00,75.00,10000.00"
    );
    assert_eq!(
        lines[2],
        "TEF_Banamex,TEF - Banamex,TEF,Banamex,2,20000.00,8000.00,1,50.00,40.00,10000.00"
    );

    let json: serde_json::Value =
        serde_json::from_str(&read_entry(&mut archive, "strategies.json")).unwrap();
    assert_eq!(json["overview"]["totalRecords"], 4);
    assert_eq!(json["overview"]["overallSuccessRate"], "50.00");
    assert_eq!(json["source"]["kind"], "file");
    assert_eq!(json["comparison"].as_array().unwrap().len(), 2);

    // 解析後的資料會寫入快取
    let cache_path = std::path::Path::new(&output_path).join("importedCsvData.json");
    let cached: serde_json::Value =
        serde_json::from_slice(&std::fs::read(cache_path).unwrap()).unwrap();
    assert_eq!(cached.as_array().unwrap().len(), 4);
    assert_eq!(cached[0]["idListaCobro"], "1001");
}

#[tokio::test]
async fn test_url_source_is_cached_between_runs() {
    let temp_dir = TempDir::new().unwrap();
    let output_path = temp_dir.path().to_str().unwrap().to_string();

    let server = MockServer::start();
    let csv_mock = server.mock(|when, then| {
        when.method(GET).path("/pruebaDatos.csv");
        then.status(200)
            .header("Content-Type", "text/csv")
            .body(COLLECTIONS_CSV);
    });

    let first = EtlEngine::new(StrategyPipeline::new(
        LocalStorage::new(output_path.clone()),
        config_for(&output_path, Some(server.url("/pruebaDatos.csv"))),
    ));
    first.run().await.unwrap();
    csv_mock.assert_hits(1);

    // 第二次執行應直接使用快取
    let second = EtlEngine::new(StrategyPipeline::new(
        LocalStorage::new(output_path.clone()),
        config_for(&output_path, Some(server.url("/pruebaDatos.csv"))),
    ));
    second.run().await.unwrap();
    csv_mock.assert_hits(1);

    let archive_path = std::path::Path::new(&output_path).join("strategy_report.zip");
    let mut archive = read_archive(&archive_path);
    let json: serde_json::Value =
        serde_json::from_str(&read_entry(&mut archive, "strategies.json")).unwrap();
    assert_eq!(json["source"]["kind"], "cache");
    assert_eq!(json["source"]["location"], DEFAULT_CACHE_KEY);

    // 強制刷新時重新下載
    let mut refresh_config = config_for(&output_path, Some(server.url("/pruebaDatos.csv")));
    refresh_config.refresh = true;
    let third = EtlEngine::new(StrategyPipeline::new(
        LocalStorage::new(output_path.clone()),
        refresh_config,
    ));
    third.run().await.unwrap();
    csv_mock.assert_hits(2);
}

#[tokio::test]
async fn test_unavailable_source_without_fallback_fails() {
    let temp_dir = TempDir::new().unwrap();
    let output_path = temp_dir.path().to_str().unwrap().to_string();

    let server = MockServer::start();
    let csv_mock = server.mock(|when, then| {
        when.method(GET).path("/missing.csv");
        then.status(404);
    });

    let engine = EtlEngine::new(StrategyPipeline::new(
        LocalStorage::new(output_path.clone()),
        config_for(&output_path, Some(server.url("/missing.csv"))),
    ));

    let result = engine.run().await;
    csv_mock.assert();
    assert!(matches!(result, Err(EtlError::SourceUnavailable { .. })));
    assert!(!std::path::Path::new(&output_path)
        .join("strategy_report.zip")
        .exists());
}

#[tokio::test]
async fn test_unavailable_source_falls_back_to_sample() {
    let temp_dir = TempDir::new().unwrap();
    let output_path = temp_dir.path().to_str().unwrap().to_string();

    let mut config = config_for(&output_path, Some("/nonexistent/pruebaDatos.csv".to_string()));
    config.no_sample_fallback = false;
    config.output_formats = vec!["json".to_string()];

    let engine = EtlEngine::new(StrategyPipeline::new(
        LocalStorage::new(output_path.clone()),
        config,
    ));
    engine.run().await.unwrap();

    let mut archive = read_archive(&std::path::Path::new(&output_path).join("strategy_report.zip"));
    assert_eq!(archive.len(), 1);
    let json: serde_json::Value =
        serde_json::from_str(&read_entry(&mut archive, "strategies.json")).unwrap();
    assert_eq!(json["source"]["kind"], "sample");
    assert_eq!(json["overview"]["totalRecords"], 4);

    // 範例資料不寫入快取
    assert!(!std::path::Path::new(&output_path)
        .join("importedCsvData.json")
        .exists());
}
