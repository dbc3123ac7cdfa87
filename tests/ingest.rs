//! End-to-end ingestion tests over synthetic workbooks.

use mediaplan::{ingest_bytes, ingest_file, CellValue, IngestionOutcome, Rejection};
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;

/// Column letter for a zero-based index (fixtures stay under 26 columns).
fn column_letter(index: usize) -> char {
    (b'A' + index as u8) as char
}

/// Build an .xlsx workbook whose first sheet holds `rows` of inline
/// strings. Empty strings leave the cell out entirely.
fn build_xlsx(rows: &[Vec<&str>]) -> Vec<u8> {
    let mut sheet = String::from("<worksheet><sheetData>");
    for (r, row) in rows.iter().enumerate() {
        sheet.push_str(&format!("<row r=\"{}\">", r + 1));
        for (c, value) in row.iter().enumerate() {
            if value.is_empty() {
                continue;
            }
            sheet.push_str(&format!(
                "<c r=\"{}{}\" t=\"inlineStr\"><is><t>{}</t></is></c>",
                column_letter(c),
                r + 1,
                value
            ));
        }
        sheet.push_str("</row>");
    }
    sheet.push_str("</sheetData></worksheet>");
    build_xlsx_from_sheet_xml(&sheet)
}

fn build_xlsx_from_sheet_xml(sheet_xml: &str) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();

    writer.start_file("xl/workbook.xml", options).unwrap();
    writer
        .write_all(
            br#"<workbook xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<sheets><sheet name="Plano" sheetId="1" r:id="rId1"/></sheets></workbook>"#,
        )
        .unwrap();

    writer
        .start_file("xl/_rels/workbook.xml.rels", options)
        .unwrap();
    writer
        .write_all(
            br#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
</Relationships>"#,
        )
        .unwrap();

    writer
        .start_file("xl/worksheets/sheet1.xml", options)
        .unwrap();
    writer.write_all(sheet_xml.as_bytes()).unwrap();

    writer.finish().unwrap().into_inner()
}

fn accepted(outcome: IngestionOutcome) -> Vec<mediaplan::Record> {
    match outcome {
        IngestionOutcome::Accepted(records) => records,
        IngestionOutcome::Rejected(why) => panic!("rejected: {}", why.message()),
    }
}

#[test]
fn accepts_plan_with_extra_column() {
    let data = build_xlsx(&[
        vec!["Campanha", "Praça", "Meio", "Veículo", "Mês", "Investimento"],
        vec!["Verão 2025", "São Paulo", "TV", "Globo", "Janeiro", "150000"],
        vec!["Verão 2025", "Rio de Janeiro", "Rádio", "CBN", "Janeiro", "30000"],
    ]);

    let records = accepted(ingest_bytes(&data));
    assert_eq!(records.len(), 2);

    let keys: Vec<&str> = records[0].keys().collect();
    assert_eq!(
        keys,
        ["CAMPANHA", "PRACA", "MEIO", "VEICULO", "MES", "INVESTIMENTO"]
    );
    assert_eq!(
        records[0].get("PRACA"),
        Some(&CellValue::Text("São Paulo".into()))
    );
    assert_eq!(
        records[1].get("VEICULO"),
        Some(&CellValue::Text("CBN".into()))
    );
}

#[test]
fn reports_missing_field_exactly() {
    let data = build_xlsx(&[
        vec!["Campanha", "Praça", "Meio", "Mês"],
        vec!["Inverno", "Curitiba", "OOH", "Julho"],
    ]);

    match ingest_bytes(&data) {
        IngestionOutcome::Rejected(Rejection::MissingFields(fields)) => {
            assert_eq!(fields, ["VEICULO"]);
            assert_eq!(
                Rejection::MissingFields(fields).message(),
                "Campos obrigatórios ausentes: VEICULO"
            );
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[test]
fn rejects_header_only_sheet() {
    let data = build_xlsx(&[vec!["Campanha", "Praça", "Meio", "Veículo", "Mês"]]);

    match ingest_bytes(&data) {
        IngestionOutcome::Rejected(why) => {
            assert_eq!(why, Rejection::NoData);
            assert_eq!(why.message(), "Nenhum dado encontrado no arquivo.");
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[test]
fn accepts_any_column_order() {
    let data = build_xlsx(&[
        vec!["Mês", "Veículo", "Meio", "Praça", "Campanha"],
        vec!["Março", "Band", "TV", "Salvador", "Outono"],
    ]);

    let records = accepted(ingest_bytes(&data));
    assert_eq!(
        records[0].get("CAMPANHA"),
        Some(&CellValue::Text("Outono".into()))
    );
    assert_eq!(records[0].get("MES"), Some(&CellValue::Text("Março".into())));
}

#[test]
fn colliding_labels_keep_later_column() {
    // "MES" and "Mês" both canonicalize to MES; the later column wins
    let data = build_xlsx(&[
        vec!["Campanha", "Praça", "Meio", "Veículo", "MES", "Mês"],
        vec!["X", "Y", "Z", "W", "Janeiro", "Fevereiro"],
    ]);

    let records = accepted(ingest_bytes(&data));
    assert_eq!(
        records[0].get("MES"),
        Some(&CellValue::Text("Fevereiro".into()))
    );
    // The collided column does not duplicate the key
    assert_eq!(records[0].keys().filter(|k| *k == "MES").count(), 1);
}

#[test]
fn skips_rows_above_header_and_blank_rows() {
    let data = build_xlsx(&[
        vec![],
        vec!["Campanha", "Praça", "Meio", "Veículo", "Mês"],
        vec![],
        vec!["Natal", "Recife", "Digital", "Meta", "Dezembro"],
    ]);

    let records = accepted(ingest_bytes(&data));
    assert_eq!(records.len(), 1);
    assert_eq!(
        records[0].get("CAMPANHA"),
        Some(&CellValue::Text("Natal".into()))
    );
}

#[test]
fn missing_cells_come_back_empty() {
    let data = build_xlsx(&[
        vec!["Campanha", "Praça", "Meio", "Veículo", "Mês"],
        vec!["Natal", "", "Digital", "Meta", "Dezembro"],
    ]);

    let records = accepted(ingest_bytes(&data));
    assert_eq!(records[0].get("PRACA"), Some(&CellValue::Empty));
}

#[test]
fn numeric_cells_survive_the_pipeline() {
    let data = build_xlsx_from_sheet_xml(
        r#"<worksheet><sheetData>
<row r="1">
  <c r="A1" t="inlineStr"><is><t>Campanha</t></is></c>
  <c r="B1" t="inlineStr"><is><t>Praça</t></is></c>
  <c r="C1" t="inlineStr"><is><t>Meio</t></is></c>
  <c r="D1" t="inlineStr"><is><t>Veículo</t></is></c>
  <c r="E1" t="inlineStr"><is><t>Mês</t></is></c>
  <c r="F1" t="inlineStr"><is><t>Verba</t></is></c>
</row>
<row r="2">
  <c r="A2" t="inlineStr"><is><t>Verão</t></is></c>
  <c r="B2" t="inlineStr"><is><t>SP</t></is></c>
  <c r="C2" t="inlineStr"><is><t>TV</t></is></c>
  <c r="D2" t="inlineStr"><is><t>Globo</t></is></c>
  <c r="E2" t="inlineStr"><is><t>Janeiro</t></is></c>
  <c r="F2"><v>150000.5</v></c>
</row>
</sheetData></worksheet>"#,
    );

    let records = accepted(ingest_bytes(&data));
    assert_eq!(records[0].get("VERBA"), Some(&CellValue::Number(150000.5)));
}

#[test]
fn records_serialize_in_column_order() {
    let data = build_xlsx(&[
        vec!["Campanha", "Praça", "Meio", "Veículo", "Mês"],
        vec!["Natal", "Recife", "Digital", "Meta", "Dezembro"],
    ]);

    let records = accepted(ingest_bytes(&data));
    let json = serde_json::to_string(&records[0]).unwrap();
    assert_eq!(
        json,
        r#"{"CAMPANHA":"Natal","PRACA":"Recife","MEIO":"Digital","VEICULO":"Meta","MES":"Dezembro"}"#
    );
}

#[test]
fn rejects_garbage_bytes() {
    match ingest_bytes(b"\x89PNG\r\n\x1a\nnot a workbook at all") {
        IngestionOutcome::Rejected(why) => {
            assert_eq!(why, Rejection::InvalidFile);
            assert_eq!(why.message(), "Erro ao processar o arquivo.");
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[test]
fn rejects_truncated_zip() {
    // ZIP magic but no archive behind it
    match ingest_bytes(&[0x50, 0x4B, 0x03, 0x04, 0x00, 0x00]) {
        IngestionOutcome::Rejected(why) => assert_eq!(why, Rejection::InvalidFile),
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[test]
fn rejects_unsupported_extension_before_reading() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("plano.csv");
    std::fs::write(&path, "Campanha;Praça\n").unwrap();

    match ingest_file(&path) {
        IngestionOutcome::Rejected(why) => {
            assert_eq!(why, Rejection::UnsupportedFileType);
            assert_eq!(why.message(), "Por favor, envie um arquivo .xlsx ou .xls");
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[test]
fn ingests_file_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("plano.xlsx");
    std::fs::write(
        &path,
        build_xlsx(&[
            vec!["Campanha", "Praça", "Meio", "Veículo", "Mês"],
            vec!["Verão", "SP", "TV", "Globo", "Janeiro"],
        ]),
    )
    .unwrap();

    let records = accepted(ingest_file(&path));
    assert_eq!(records.len(), 1);
}

#[test]
fn rejects_missing_file_as_invalid() {
    match ingest_file("no-such-plan.xlsx") {
        IngestionOutcome::Rejected(why) => assert_eq!(why, Rejection::InvalidFile),
        other => panic!("unexpected outcome: {:?}", other),
    }
}

// Legacy .xls fixtures: a minimal BIFF8 workbook stream wrapped in a
// version-3 compound file.
mod xls_fixture {
    const BOF: u16 = 2057;
    const EOF: u16 = 10;
    const BOUND_SHEET8: u16 = 133;
    const SST: u16 = 252;
    const LABEL_SST: u16 = 253;

    pub fn record(kind: u16, payload: &[u8]) -> Vec<u8> {
        let mut bytes = kind.to_le_bytes().to_vec();
        bytes.extend((payload.len() as u16).to_le_bytes());
        bytes.extend_from_slice(payload);
        bytes
    }

    fn bof() -> Vec<u8> {
        let mut payload = vec![0x00, 0x06, 0x05, 0x00];
        payload.extend([0u8; 12]);
        record(BOF, &payload)
    }

    fn boundsheet(offset: u32, name: &str) -> Vec<u8> {
        let mut payload = offset.to_le_bytes().to_vec();
        payload.extend([0u8, 0u8]);
        payload.push(name.len() as u8);
        payload.push(0);
        payload.extend(name.as_bytes());
        record(BOUND_SHEET8, &payload)
    }

    fn sst(strings: &[&str]) -> Vec<u8> {
        let mut payload = (strings.len() as u32).to_le_bytes().to_vec();
        payload.extend((strings.len() as u32).to_le_bytes());
        for s in strings {
            let wide = !s.is_ascii();
            payload.extend((s.chars().count() as u16).to_le_bytes());
            payload.push(if wide { 1 } else { 0 });
            if wide {
                for unit in s.encode_utf16() {
                    payload.extend(unit.to_le_bytes());
                }
            } else {
                payload.extend(s.as_bytes());
            }
        }
        record(SST, &payload)
    }

    fn label_sst(row: u16, col: u16, index: u32) -> Vec<u8> {
        let mut payload = row.to_le_bytes().to_vec();
        payload.extend(col.to_le_bytes());
        payload.extend(0u16.to_le_bytes());
        payload.extend(index.to_le_bytes());
        record(LABEL_SST, &payload)
    }

    /// Build a complete .xls file holding `rows` of shared strings.
    pub fn build_xls(rows: &[Vec<&str>]) -> Vec<u8> {
        let mut strings: Vec<&str> = Vec::new();
        let mut cells = Vec::new();
        for (r, row) in rows.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                if value.is_empty() {
                    continue;
                }
                let index = match strings.iter().position(|s| s == value) {
                    Some(i) => i,
                    None => {
                        strings.push(value);
                        strings.len() - 1
                    }
                };
                cells.push(label_sst(r as u16, c as u16, index as u32));
            }
        }

        let assemble = |offset: u32| {
            let mut stream = bof();
            stream.extend(sst(&strings));
            stream.extend(boundsheet(offset, "Plano"));
            stream.extend(record(EOF, &[]));
            stream
        };
        let sheet_offset = assemble(0).len() as u32;
        let mut stream = assemble(sheet_offset);
        stream.extend(bof());
        for cell in &cells {
            stream.extend(cell.clone());
        }
        stream.extend(record(EOF, &[]));

        wrap_in_cfb("Workbook", &stream)
    }

    fn wrap_in_cfb(name: &str, payload: &[u8]) -> Vec<u8> {
        const FAT_SECT: u32 = 0xFFFF_FFFD;
        const END_OF_CHAIN: u32 = 0xFFFF_FFFE;
        const FREE_SECT: u32 = 0xFFFF_FFFF;

        let stream_size = payload.len().max(4096);
        let mut stream = payload.to_vec();
        stream.resize(stream_size, 0);
        stream.resize(stream_size.div_ceil(512) * 512, 0);
        let stream_sectors = stream.len() / 512;
        assert!(stream_sectors <= 125, "fixture stream too large");

        let mut header = vec![0u8; 512];
        header[..8].copy_from_slice(&0xE11A_B1A1_E011_CFD0u64.to_le_bytes());
        header[24..26].copy_from_slice(&0x003Eu16.to_le_bytes());
        header[26..28].copy_from_slice(&3u16.to_le_bytes());
        header[28..30].copy_from_slice(&0xFFFEu16.to_le_bytes());
        header[30..32].copy_from_slice(&9u16.to_le_bytes());
        header[32..34].copy_from_slice(&6u16.to_le_bytes());
        header[44..48].copy_from_slice(&1u32.to_le_bytes());
        header[48..52].copy_from_slice(&1u32.to_le_bytes());
        header[56..60].copy_from_slice(&4096u32.to_le_bytes());
        header[60..64].copy_from_slice(&END_OF_CHAIN.to_le_bytes());
        header[68..72].copy_from_slice(&END_OF_CHAIN.to_le_bytes());
        header[76..80].copy_from_slice(&0u32.to_le_bytes());
        for i in 1..109 {
            let at = 76 + i * 4;
            header[at..at + 4].copy_from_slice(&FREE_SECT.to_le_bytes());
        }

        let mut fat = Vec::with_capacity(128);
        fat.push(FAT_SECT);
        fat.push(END_OF_CHAIN);
        for i in 0..stream_sectors {
            if i + 1 < stream_sectors {
                fat.push(2 + i as u32 + 1);
            } else {
                fat.push(END_OF_CHAIN);
            }
        }
        fat.resize(128, FREE_SECT);
        let mut fat_sector = Vec::with_capacity(512);
        for entry in fat {
            fat_sector.extend(entry.to_le_bytes());
        }

        let mut directory = vec![0u8; 512];
        write_dir_entry(&mut directory[..128], "Root Entry", 5, END_OF_CHAIN, 0);
        write_dir_entry(&mut directory[128..256], name, 2, 2, stream_size as u64);

        let mut file = header;
        file.extend(fat_sector);
        file.extend(directory);
        file.extend(stream);
        file
    }

    fn write_dir_entry(slot: &mut [u8], name: &str, kind: u8, start: u32, size: u64) {
        let units: Vec<u16> = name.encode_utf16().collect();
        for (i, unit) in units.iter().enumerate() {
            slot[i * 2..i * 2 + 2].copy_from_slice(&unit.to_le_bytes());
        }
        let name_len = ((units.len() + 1) * 2) as u16;
        slot[64..66].copy_from_slice(&name_len.to_le_bytes());
        slot[66] = kind;
        slot[116..120].copy_from_slice(&start.to_le_bytes());
        slot[120..128].copy_from_slice(&size.to_le_bytes());
    }
}

#[test]
fn accepts_legacy_xls_plan() {
    let data = xls_fixture::build_xls(&[
        vec!["Campanha", "Praça", "Meio", "Veículo", "Mês"],
        vec!["Verão", "São Paulo", "TV", "Globo", "Janeiro"],
    ]);

    let records = accepted(ingest_bytes(&data));
    assert_eq!(records.len(), 1);
    let keys: Vec<&str> = records[0].keys().collect();
    assert_eq!(keys, ["CAMPANHA", "PRACA", "MEIO", "VEICULO", "MES"]);
    assert_eq!(
        records[0].get("PRACA"),
        Some(&CellValue::Text("São Paulo".into()))
    );
}

#[test]
fn rejects_xls_missing_fields() {
    let data = xls_fixture::build_xls(&[
        vec!["Campanha", "Meio", "Mês"],
        vec!["Verão", "TV", "Janeiro"],
    ]);

    match ingest_bytes(&data) {
        IngestionOutcome::Rejected(Rejection::MissingFields(fields)) => {
            assert_eq!(fields, ["PRACA", "VEICULO"]);
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[test]
fn rejects_xls_with_no_data_rows() {
    let data = xls_fixture::build_xls(&[vec!["Campanha", "Praça", "Meio", "Veículo", "Mês"]]);

    match ingest_bytes(&data) {
        IngestionOutcome::Rejected(why) => assert_eq!(why, Rejection::NoData),
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[cfg(feature = "async")]
#[test]
fn ingests_file_async() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("plano.xlsx");
    std::fs::write(
        &path,
        build_xlsx(&[
            vec!["Campanha", "Praça", "Meio", "Veículo", "Mês"],
            vec!["Verão", "SP", "TV", "Globo", "Janeiro"],
        ]),
    )
    .unwrap();

    // tokio::fs only needs the blocking pool, no I/O driver
    let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
    let records = accepted(runtime.block_on(mediaplan::ingest_file_async(&path)));
    assert_eq!(records.len(), 1);
}
