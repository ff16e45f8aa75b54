// ==========================================
// BulkImporter 端到端测试
// ==========================================
// 测试目标: 文件 → 校验 → 任务负载 → 审计日志
// ==========================================


use cms_bulk_import::domain::{FieldMapping, ImportActor};
use cms_bulk_import::importer::BulkImporter;
use cms_bulk_import::logging;
use tempfile::TempDir;
use test_helpers::{
    count_rows, create_test_db, create_test_importer, latest_job_payload, product_request,
    test_settings, write_csv, write_xlsx,
};

fn actor() -> ImportActor {
    ImportActor::new(42, "Tester", 1)
}

#[tokio::test]
async fn test_invalid_number_rejects_whole_file() {
    logging::init_test();

    let (_db_file, db_path) = create_test_db().expect("Failed to create test db");
    let dir = TempDir::new().unwrap();
    let csv = write_csv(&dir, "products.csv", "id;title;price\n0;Widget;12,50\n0;Gadget;abc\n");

    let importer = create_test_importer(&db_path, test_settings(&dir));
    let request = product_request(csv, &["title", "price"]);
    let result = importer.import(&request, &actor()).await;

    assert_eq!(result.items_total, 2);
    assert_eq!(result.successful, 2);
    assert_eq!(result.failed, 1);
    assert!(result.job_id.is_none());
    assert!(result.errors[0].contains("Row 3"), "{:?}", result.errors);
    assert!(result.errors[0].contains("price"));
    // 用户信息使用显示名
    assert!(result.user_friendly_errors[0].contains("Prijs"), "{:?}", result.user_friendly_errors);

    // 没有任务，但审计日志已写入
    assert_eq!(count_rows(&db_path, "import_job"), 0);
    assert_eq!(count_rows(&db_path, "import_log"), 1);
}

#[tokio::test]
async fn test_successful_import_persists_job() {
    logging::init_test();

    let (_db_file, db_path) = create_test_db().expect("Failed to create test db");
    let dir = TempDir::new().unwrap();
    let csv = write_csv(
        &dir,
        "products.csv",
        "id;title;price;in_stock;available_from;color\n\
         0;Widget;1.234,50;true;31-12-2024;rood\n\
         2;Gadget;;0;2025-01-15;1,Blauw\n",
    );

    let importer = create_test_importer(&db_path, test_settings(&dir));
    let request = product_request(
        csv,
        &["title", "price", "in_stock", "available_from", "color"],
    );
    let result = importer.import(&request, &actor()).await;

    assert!(!result.has_failures(), "{:?}", result.errors);
    assert_eq!(result.items_total, 2);
    assert_eq!(result.items_created, 1);
    assert_eq!(result.items_updated, 1);
    assert!(result.job_id.is_some());
    assert_eq!(count_rows(&db_path, "import_job"), 1);
    assert_eq!(count_rows(&db_path, "import_log"), 1);

    let payload = latest_job_payload(&db_path);
    let records = payload.as_array().unwrap();
    assert_eq!(records.len(), 2);

    let first = &records[0];
    assert_eq!(first["Item"]["Title"], "Widget");
    assert_eq!(first["Item"]["ModuleId"], 700);
    assert!(first["Item"].get("Id").is_none());

    let detail = |record: &serde_json::Value, key: &str| {
        record["Details"]
            .as_array()
            .unwrap()
            .iter()
            .find(|d| d["Key"] == key)
            .map(|d| d["Value"].as_str().unwrap().to_string())
    };
    assert_eq!(detail(first, "price").as_deref(), Some("1234.5"));
    assert_eq!(detail(first, "in_stock").as_deref(), Some("1"));
    assert_eq!(detail(first, "available_from").as_deref(), Some("2024-12-31"));
    assert_eq!(detail(first, "color").as_deref(), Some("1"));
    assert_eq!(detail(first, "color_input").as_deref(), Some("Rood"));
    // 标题列写入 item 本身，不产生明细
    assert_eq!(detail(first, "ItemTitle"), None);
    assert_eq!(detail(first, "title"), None);

    let second = &records[1];
    assert_eq!(second["Item"]["Id"], 2);
    assert_eq!(detail(second, "price").as_deref(), Some("0"));
    assert_eq!(detail(second, "color").as_deref(), Some("1,2"));
    assert_eq!(detail(second, "color_input").as_deref(), Some("Rood, Blauw"));
}

#[tokio::test]
async fn test_missing_id_column_csv() {
    let (_db_file, db_path) = create_test_db().expect("Failed to create test db");
    let dir = TempDir::new().unwrap();
    let csv = write_csv(&dir, "products.csv", "title;price\nWidget;1\n");

    let importer = create_test_importer(&db_path, test_settings(&dir));
    let result = importer
        .import(&product_request(csv, &["title", "price"]), &actor())
        .await;

    assert_eq!(result.failed, 1);
    assert_eq!(result.items_total, 0);
    assert!(result.errors[0].contains("'id'"));
    assert_eq!(count_rows(&db_path, "import_job"), 0);
}

#[tokio::test]
async fn test_xlsx_import() {
    let (_db_file, db_path) = create_test_db().expect("Failed to create test db");
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("products.xlsx");
    write_xlsx(
        &path,
        &[&["ID", "title", "price"], &["0", "Widget", "3,5"], &["", "", ""], &["1", "Gadget", "7"]],
    )
    .unwrap();

    let importer = create_test_importer(&db_path, test_settings(&dir));
    let result = importer
        .import(&product_request(path, &["title", "price"]), &actor())
        .await;

    assert!(!result.has_failures(), "{:?}", result.errors);
    // 空白行不计数
    assert_eq!(result.items_total, 2);
    assert!(result.job_id.is_some());
}

#[tokio::test]
async fn test_xlsx_without_id_column() {
    let (_db_file, db_path) = create_test_db().expect("Failed to create test db");
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("products.xlsx");
    write_xlsx(&path, &[&["title"], &["Widget"]]).unwrap();

    let importer = create_test_importer(&db_path, test_settings(&dir));
    let result = importer
        .import(&product_request(path, &["title"]), &actor())
        .await;

    assert_eq!(result.failed, 1);
    assert_eq!(result.items_total, 0);
}

#[tokio::test]
async fn test_unsupported_extension() {
    let (_db_file, db_path) = create_test_db().expect("Failed to create test db");
    let dir = TempDir::new().unwrap();
    let path = write_csv(&dir, "products.txt", "id;title\n0;Widget\n");

    let importer = create_test_importer(&db_path, test_settings(&dir));
    let result = importer.import(&product_request(path, &["title"]), &actor()).await;

    assert_eq!(result.failed, 1);
    assert!(result.errors[0].contains("txt"), "{:?}", result.errors);
    assert_eq!(count_rows(&db_path, "import_log"), 1);
}

#[tokio::test]
async fn test_combobox_value_not_found() {
    let (_db_file, db_path) = create_test_db().expect("Failed to create test db");
    let dir = TempDir::new().unwrap();
    let csv = write_csv(&dir, "products.csv", "id;color\n0;Groen\n");

    let importer = create_test_importer(&db_path, test_settings(&dir));
    let result = importer.import(&product_request(csv, &["color"]), &actor()).await;

    assert_eq!(result.failed, 1);
    assert!(result.errors[0].contains("Groen"));
    assert!(result.user_friendly_errors[0].contains("Kleur"));
}

#[tokio::test]
async fn test_not_importable_field() {
    let (_db_file, db_path) = create_test_db().expect("Failed to create test db");
    let dir = TempDir::new().unwrap();
    let csv = write_csv(&dir, "products.csv", "id;secret\n0;hunter2\n");

    let importer = create_test_importer(&db_path, test_settings(&dir));
    let result = importer.import(&product_request(csv, &["secret"]), &actor()).await;

    assert_eq!(result.failed, 1);
    assert!(result.errors[0].contains("secure-input"), "{:?}", result.errors);
}

#[tokio::test]
async fn test_combobox_as_item_link() {
    let (_db_file, db_path) = create_test_db().expect("Failed to create test db");
    let dir = TempDir::new().unwrap();
    let csv = write_csv(&dir, "products.csv", "id;title;brand\n0;Widget;Acme\n");

    let importer = create_test_importer(&db_path, test_settings(&dir));
    let result = importer
        .import(&product_request(csv, &["title", "brand"]), &actor())
        .await;

    assert!(!result.has_failures(), "{:?}", result.errors);
    let payload = latest_job_payload(&db_path);
    let record = &payload[0];
    let links = record["Links"].as_array().unwrap();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0]["DestinationItemId"], 10);
    assert_eq!(links[0]["LinkType"], 3);
    // 链接模式只保存显示文本
    let details = record["Details"].as_array().unwrap();
    assert!(details.iter().any(|d| d["Key"] == "brand_input" && d["Value"] == "Acme"));
    assert!(!details.iter().any(|d| d["Key"] == "brand"));
}

#[tokio::test]
async fn test_max_rows_limit() {
    let (_db_file, db_path) = create_test_db().expect("Failed to create test db");
    let dir = TempDir::new().unwrap();
    let csv = write_csv(&dir, "products.csv", "id;title\n0;A\n0;B\n0;C\n");

    let importer = create_test_importer(&db_path, test_settings(&dir).with_max_rows(2));
    let result = importer.import(&product_request(csv, &["title"]), &actor()).await;

    assert!(!result.has_failures());
    assert_eq!(result.items_total, 2);
}

#[tokio::test]
async fn test_max_rows_limit_xlsx() {
    let (_db_file, db_path) = create_test_db().expect("Failed to create test db");
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("products.xlsx");
    write_xlsx(
        &path,
        &[&["id", "title"], &["0", "A"], &["0", "B"], &["0", "C"], &["0", "D"]],
    )
    .unwrap();

    let importer = create_test_importer(&db_path, test_settings(&dir).with_max_rows(3));
    let result = importer.import(&product_request(path, &["title"]), &actor()).await;

    assert!(!result.has_failures());
    assert_eq!(result.items_total, 3);
    let payload = latest_job_payload(&db_path);
    let titles: Vec<&str> = payload
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["Item"]["Title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["A", "B", "C"]);
}

#[tokio::test]
async fn test_blank_row_counts_against_max_rows() {
    let (_db_file, db_path) = create_test_db().expect("Failed to create test db");
    let dir = TempDir::new().unwrap();
    // 第二行全部为空单元格：跳过但仍占用行数上限
    let csv = write_csv(&dir, "products.csv", "id;title;price\n0;A;1\n;;\n0;C;3\n");

    let importer = create_test_importer(&db_path, test_settings(&dir).with_max_rows(2));
    let result = importer
        .import(&product_request(csv, &["title", "price"]), &actor())
        .await;

    assert!(!result.has_failures());
    assert_eq!(result.items_total, 1);
    let payload = latest_job_payload(&db_path);
    let records = payload.as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["Item"]["Title"], "A");
}

#[tokio::test]
async fn test_unmapped_columns_ignored() {
    let (_db_file, db_path) = create_test_db().expect("Failed to create test db");
    let dir = TempDir::new().unwrap();
    let csv = write_csv(&dir, "products.csv", "id;title;price;remarks\n0;Widget;abc;x\n");

    let importer = create_test_importer(&db_path, test_settings(&dir));
    // price 不在映射中，不参与校验
    let mut request = product_request(csv, &["title"]);
    request.item_mappings.push(FieldMapping {
        column: "missing".to_string(),
        property_name: "price".to_string(),
        ..Default::default()
    });
    let result = importer.import(&request, &actor()).await;

    assert!(!result.has_failures(), "{:?}", result.errors);
    assert_eq!(result.items_total, 1);
}

#[tokio::test]
async fn test_batch_import() {
    let (_db_file, db_path) = create_test_db().expect("Failed to create test db");
    let dir = TempDir::new().unwrap();
    let good = write_csv(&dir, "good.csv", "id;title\n0;Widget\n");
    let bad = write_csv(&dir, "bad.csv", "id;price\n0;abc\n");

    let importer = create_test_importer(&db_path, test_settings(&dir));
    let requests = vec![
        product_request(good, &["title"]),
        product_request(bad, &["price"]),
    ];
    let results = importer.batch_import(&requests, &actor()).await;

    assert_eq!(results.len(), 2);
    assert!(results[0].job_id.is_some());
    assert!(results[1].has_failures());
    assert_eq!(count_rows(&db_path, "import_log"), 2);
}
