/// 설치 → 스캔 → 토글 → 삭제 전체 흐름 통합 테스트
/// 네트워크 없이 로컬 ZIP 픽스처로만 검증
use std::io::Write;
use std::path::Path;
use zen_core::install;
use zen_core::scan::{self, AddonStatus};

/// 최상위 폴더 하나에 디스크립터와 lua 파일이 든 애드온 ZIP 생성
fn write_addon_zip(zip_path: &Path, top_folder: &str, toc_name: &str, toc_content: &str) {
    let file = std::fs::File::create(zip_path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    let options = zip::write::FileOptions::default();

    zip.start_file(format!("{}/{}.toc", top_folder, toc_name), options)
        .unwrap();
    zip.write_all(toc_content.as_bytes()).unwrap();
    zip.start_file(format!("{}/core.lua", top_folder), options)
        .unwrap();
    zip.write_all(b"-- noop\n").unwrap();
    zip.finish().unwrap();
}

#[tokio::test]
async fn install_scan_toggle_delete_roundtrip() {
    let tmp = tempfile::tempdir().unwrap();
    let addons = tmp.path().join("AddOns");
    std::fs::create_dir(&addons).unwrap();

    let zip_path = tmp.path().join("fixture.zip");
    write_addon_zip(
        &zip_path,
        "AlphaUI",
        "AlphaUI",
        "## Title: Alpha UI\n## Version: 1.4\n## Author: tester\n",
    );

    let outcome = install::install_from_file(&zip_path, &addons).await.unwrap();
    assert_eq!(outcome.addon_name, "AlphaUI");
    assert!(outcome.addon_path.join("AlphaUI.toc").is_file());
    assert!(outcome.addon_path.join("core.lua").is_file());

    let scanned = scan::scan(&addons).await.unwrap();
    assert_eq!(scanned.len(), 1);
    assert_eq!(scanned[0].title, "Alpha UI");
    assert_eq!(scanned[0].version, "1.4");
    assert_eq!(scanned[0].status, AddonStatus::Enabled);

    // 비활성화하면 스캔에도 반영
    let status = scan::set_addon_status(&outcome.addon_path, false)
        .await
        .unwrap();
    assert_eq!(status, AddonStatus::Disabled);
    let scanned = scan::scan(&addons).await.unwrap();
    assert_eq!(scanned[0].status, AddonStatus::Disabled);

    scan::delete_addon(&outcome.addon_path).await.unwrap();
    assert!(scan::scan(&addons).await.unwrap().is_empty());
}

#[tokio::test]
async fn reinstall_conflicts_and_preserves_existing() {
    let tmp = tempfile::tempdir().unwrap();
    let addons = tmp.path().join("AddOns");
    std::fs::create_dir(&addons).unwrap();

    let zip_path = tmp.path().join("fixture.zip");
    write_addon_zip(&zip_path, "BetaBars", "BetaBars", "## Title: Beta\n");

    install::install_from_file(&zip_path, &addons).await.unwrap();
    let marker = addons.join("BetaBars").join("user-edit.lua");
    std::fs::write(&marker, "-- local change\n").unwrap();

    let err = install::install_from_file(&zip_path, &addons)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), zen_core::error::ErrorKind::Conflict);
    assert!(err.to_string().contains("BetaBars"));

    // 기존 설치본은 건드리지 않음
    assert!(marker.is_file());
}

#[tokio::test]
async fn suffixed_archive_folder_installs_under_stripped_name() {
    let tmp = tempfile::tempdir().unwrap();
    let addons = tmp.path().join("AddOns");
    std::fs::create_dir(&addons).unwrap();

    // GitHub 아카이브 모양: pfUI-master/pfUI.toc
    let zip_path = tmp.path().join("pfUI-master.zip");
    write_addon_zip(&zip_path, "pfUI-master", "pfUI", "## Title: pfUI\n");

    let outcome = install::install_from_file(&zip_path, &addons).await.unwrap();
    assert_eq!(outcome.addon_name, "pfUI");
    assert!(addons.join("pfUI").join("pfUI.toc").is_file());
    assert!(!addons.join("pfUI-master").exists());
}

#[tokio::test]
async fn nested_descriptor_is_located_and_hoisted() {
    let tmp = tempfile::tempdir().unwrap();
    let addons = tmp.path().join("AddOns");
    std::fs::create_dir(&addons).unwrap();

    // 디스크립터가 한 단계 더 아래에 있는 아카이브
    let zip_path = tmp.path().join("nested.zip");
    let file = std::fs::File::create(&zip_path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    let options = zip::write::FileOptions::default();
    zip.start_file("release-v2/GammaGrid/GammaGrid.toc", options)
        .unwrap();
    zip.write_all(b"## Title: Gamma\n").unwrap();
    zip.finish().unwrap();

    let outcome = install::install_from_file(&zip_path, &addons).await.unwrap();
    assert_eq!(outcome.addon_name, "GammaGrid");
    assert!(addons.join("GammaGrid").join("GammaGrid.toc").is_file());
}

#[tokio::test]
async fn garbage_archive_is_malformed() {
    let tmp = tempfile::tempdir().unwrap();
    let addons = tmp.path().join("AddOns");
    std::fs::create_dir(&addons).unwrap();

    let bogus = tmp.path().join("not-a-zip.zip");
    std::fs::write(&bogus, b"definitely not a zip").unwrap();

    let err = install::install_from_file(&bogus, &addons).await.unwrap_err();
    assert_eq!(err.kind(), zen_core::error::ErrorKind::Malformed);
}

#[tokio::test]
async fn archive_without_descriptor_is_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let addons = tmp.path().join("AddOns");
    std::fs::create_dir(&addons).unwrap();

    let zip_path = tmp.path().join("no-toc.zip");
    let file = std::fs::File::create(&zip_path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    zip.start_file("Docs/readme.txt", zip::write::FileOptions::default())
        .unwrap();
    zip.write_all(b"no descriptor here").unwrap();
    zip.finish().unwrap();

    let err = install::install_from_file(&zip_path, &addons).await.unwrap_err();
    assert_eq!(err.kind(), zen_core::error::ErrorKind::NotFound);
    // 목적지에는 아무것도 남지 않아야 함
    assert_eq!(std::fs::read_dir(&addons).unwrap().count(), 0);
}
