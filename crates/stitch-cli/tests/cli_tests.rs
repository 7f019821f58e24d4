use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Helper function to create a temporary directory for CLI tests
fn create_cli_test_environment() -> TempDir {
    TempDir::new().expect("Failed to create temporary directory")
}

/// Helper function to create a Command with --no-color against a database
fn stitch_cmd(db_path: &Path) -> Command {
    let mut cmd = Command::cargo_bin("stitch").expect("Failed to find stitch binary");
    cmd.arg("--no-color")
        .arg("--database-file")
        .arg(db_path)
        .arg("--user")
        .arg("Ana");
    cmd
}

fn create_order(db_path: &Path, sizes: &str, total: &str) {
    stitch_cmd(db_path)
        .args(["order", "create", "--sizes", sizes, "--total", total])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created order"));
}

#[test]
fn test_cli_help_output() {
    Command::cargo_bin("stitch")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("order"))
        .stdout(predicate::str::contains("stock"))
        .stdout(predicate::str::contains("--database-file"));
}

#[test]
fn test_cli_version_output() {
    Command::cargo_bin("stitch")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("stitch"));
}

#[test]
fn test_cli_default_lists_empty_orders() {
    let temp_dir = create_cli_test_environment();
    let db_path = temp_dir.path().join("cli_test.db");

    stitch_cmd(&db_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("No orders found."));
}

#[test]
fn test_cli_create_and_show_order() {
    let temp_dir = create_cli_test_environment();
    let db_path = temp_dir.path().join("cli_test.db");

    stitch_cmd(&db_path)
        .args([
            "order",
            "create",
            "--sizes",
            "Polo Negro (M) x2",
            "--total",
            "150",
            "--advance",
            "50",
            "--set",
            "clientName=Rosa",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created order 000001"))
        .stdout(predicate::str::contains("pending 100.00"));

    stitch_cmd(&db_path)
        .args(["order", "show", "000001"])
        .assert()
        .success()
        .stdout(predicate::str::contains("# Order 000001"))
        .stdout(predicate::str::contains("Polo Negro (M) x2"))
        .stdout(predicate::str::contains("Pedido Creado"));
}

#[test]
fn test_cli_advance_rejected_then_accepted() {
    let temp_dir = create_cli_test_environment();
    let db_path = temp_dir.path().join("cli_test.db");
    create_order(&db_path, "Polo Negro (M)", "80");

    stitch_cmd(&db_path)
        .args(["order", "advance", "000001", "--from", "design"])
        .assert()
        .success()
        .stdout(predicate::str::contains("cannot advance yet"))
        .stdout(predicate::str::contains("- URL Agregado"));

    stitch_cmd(&db_path)
        .args(["order", "set", "000001", "designLink", "https://example.com/m.png"])
        .assert()
        .success()
        .stdout(predicate::str::contains("designLink = https://example.com/m.png"));

    stitch_cmd(&db_path)
        .args(["order", "advance", "000001", "--from", "design"])
        .assert()
        .success()
        .stdout(predicate::str::contains("moved from Diseño to Cobranza"));

    stitch_cmd(&db_path)
        .args(["order", "show", "000001"])
        .assert()
        .success()
        .stdout(predicate::str::contains("En Diseño → En Cobranza por Ana"));
}

#[test]
fn test_cli_advance_from_stale_stage_fails() {
    let temp_dir = create_cli_test_environment();
    let db_path = temp_dir.path().join("cli_test.db");
    create_order(&db_path, "Polo Negro (M)", "0");

    stitch_cmd(&db_path)
        .args(["order", "advance", "000001", "--from", "billing"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("is in stage"));
}

#[test]
fn test_cli_invalid_order_id() {
    let temp_dir = create_cli_test_environment();
    let db_path = temp_dir.path().join("cli_test.db");

    stitch_cmd(&db_path)
        .args(["order", "show", "404"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_cli_cancel_and_list_all() {
    let temp_dir = create_cli_test_environment();
    let db_path = temp_dir.path().join("cli_test.db");
    create_order(&db_path, "Polo Negro (M)", "0");

    stitch_cmd(&db_path)
        .args(["order", "cancel", "000001", "--reason", "cliente desistió"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Anulado"));

    stitch_cmd(&db_path)
        .args(["order", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No orders found."));

    stitch_cmd(&db_path)
        .args(["order", "list", "--all"])
        .assert()
        .success()
        .stdout(predicate::str::contains("000001"));
}

#[test]
fn test_cli_stock_import_list_and_export() {
    let temp_dir = create_cli_test_environment();
    let db_path = temp_dir.path().join("cli_test.db");
    let csv_path = temp_dir.path().join("stock.csv");
    std::fs::write(&csv_path, "TIPO,COLOR,TALLA,CANTIDAD\nPolo,Negro,M,5\nGorra,,Unica,2\n").unwrap();

    stitch_cmd(&db_path)
        .args(["stock", "import", csv_path.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Imported 2 rows (7 units)"));

    stitch_cmd(&db_path)
        .args(["stock", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("| Polo | Negro | M | 5 | 0 |"))
        .stdout(predicate::str::contains("2 records, 7 units."));

    stitch_cmd(&db_path)
        .args(["stock", "export"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Type,Color,Size,Quantity\n"));

    stitch_cmd(&db_path)
        .args(["stock", "history"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Ana"));
}

#[test]
fn test_cli_stock_check() {
    let temp_dir = create_cli_test_environment();
    let db_path = temp_dir.path().join("cli_test.db");
    create_order(&db_path, "Polo Negro (M) x2", "0");

    stitch_cmd(&db_path)
        .args(["stock", "check", "000001"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Stock is short"));
}

#[test]
fn test_cli_import_headers_preview() {
    let temp_dir = create_cli_test_environment();
    let db_path = temp_dir.path().join("cli_test.db");

    stitch_cmd(&db_path)
        .args([
            "import",
            "headers",
            "N° Pedido",
            "Total",
            "***",
            "Notas",
            "--override",
            "Notas=no-mapear",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("`amounts.total`"))
        .stdout(predicate::str::contains("Unmapped: ***"))
        .stdout(predicate::str::contains("Skipped: Notas"));
}

#[test]
fn test_cli_import_rows() {
    let temp_dir = create_cli_test_environment();
    let db_path = temp_dir.path().join("cli_test.db");
    let csv_path = temp_dir.path().join("orders.csv");
    std::fs::write(
        &csv_path,
        "N° Pedido,Nombre,Total,Estado General\n55,Rosa,100,En Cobranza\n56,Luis,40,\n",
    )
    .unwrap();

    stitch_cmd(&db_path)
        .args(["import", "rows", csv_path.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Imported 2 rows"));

    stitch_cmd(&db_path)
        .args(["order", "show", "55"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Stage: Cobranza"))
        .stdout(predicate::str::contains("- Imported"));
}

#[test]
fn test_cli_import_rows_refuses_unmapped_columns() {
    let temp_dir = create_cli_test_environment();
    let db_path = temp_dir.path().join("cli_test.db");
    let csv_path = temp_dir.path().join("orders.csv");
    std::fs::write(&csv_path, "N° Pedido,Nombre,***\n57,Rosa,x\n").unwrap();

    stitch_cmd(&db_path)
        .args(["import", "rows", csv_path.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unmapped columns: ***"));

    stitch_cmd(&db_path)
        .args(["order", "show", "57"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));

    stitch_cmd(&db_path)
        .args([
            "import",
            "rows",
            csv_path.to_str().unwrap(),
            "--override",
            "***=no-mapear",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Imported 1 rows"));
}

#[test]
fn test_cli_flow_conditions() {
    let temp_dir = create_cli_test_environment();
    let db_path = temp_dir.path().join("cli_test.db");

    stitch_cmd(&db_path)
        .args(["flow", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Tallas Agregadas"));

    stitch_cmd(&db_path)
        .args(["flow", "set-conditions", "design", "--exit", "link_added"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Exit: URL Agregado"))
        .stdout(predicate::str::contains("Tallas Agregadas").not());

    stitch_cmd(&db_path)
        .args(["flow", "set-conditions", "design", "--exit", "telepathy"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown condition kind"));
}

#[test]
fn test_cli_fields_and_columns() {
    let temp_dir = create_cli_test_environment();
    let db_path = temp_dir.path().join("cli_test.db");

    stitch_cmd(&db_path)
        .args(["fields", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("`designLink`"));

    stitch_cmd(&db_path)
        .args(["columns", "set", "billing", "--show", "id,amountPending"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Saved columns for billing"))
        .stdout(predicate::str::contains("`amountPending`"));

    stitch_cmd(&db_path)
        .args(["columns", "set", "billing", "--show", "nope"])
        .assert()
        .failure();
}

#[test]
fn test_cli_recheck_without_paused_orders() {
    let temp_dir = create_cli_test_environment();
    let db_path = temp_dir.path().join("cli_test.db");

    stitch_cmd(&db_path)
        .arg("recheck")
        .assert()
        .success()
        .stdout(predicate::str::contains("No paused orders could be released."));
}
