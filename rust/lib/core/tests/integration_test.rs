/// Integration test for the batch/record domain engine: a production
/// run flowing through two segments, seen by a material-entry operator.
use batchline_core::deletion::{DeletionChain, Selection};
use batchline_core::schema::SegmentDefinitions;
use batchline_core::{
    Batch, BatchIndex, DefinitionIndex, EquipmentForm, FieldConfig, MaterialForm, PermissionSet,
    Role,
};

fn run_batches() -> Vec<Batch> {
    serde_json::from_str(
        r#"[{
            "id": 2,
            "batch_number": "B-100",
            "product_name": "ProductX",
            "process_segment": "成型",
            "status": "已完成",
            "created_by_name": "op",
            "segment_summaries": [
                {"batch_id": 1, "process_segment": "混合", "status": "进行中",
                 "material_count": 2, "equipment_count": 1, "quality_count": 0},
                {"batch_id": 2, "process_segment": "成型", "status": "已完成",
                 "material_count": 1, "equipment_count": 2, "quality_count": 3}
            ]
        }]"#,
    )
    .unwrap()
}

fn forming_definitions() -> DefinitionIndex {
    let defs: SegmentDefinitions = serde_json::from_str(
        r#"{
            "materials": [{"code": "M-01", "name": "树脂", "supplier": "供应商A", "unit": "kg"}],
            "equipment": [{"code": "E-01", "name": "成型机", "parameters": [
                {"key": "temperature", "label": "温度", "type": "number", "unit": "℃", "required": true},
                {"key": "mode", "type": "select", "options": ["自动", "手动"], "default": "自动"}
            ]}],
            "quality": [{"item": "硬度", "unit": "HRC", "min": 50.0, "max": 60.0}]
        }"#,
    )
    .unwrap();
    DefinitionIndex::from_definitions(&defs)
}

#[test]
fn test_material_operator_walks_the_forming_segment() {
    let role = Role::parse("物料/设备录入");
    assert_eq!(role, Role::WriteMaterial);
    let permissions = PermissionSet::resolve(&role);
    assert!(!permissions.view_quality);
    assert!(permissions.manage_materials && permissions.manage_equipment);

    // One run, two segment rows sharing the batch number.
    let index = BatchIndex::from_batches(&run_batches());
    assert_eq!(index.len(), 2);
    let forming = index.find_by_id(2).unwrap();
    assert!(forming.is_latest_segment);
    assert_eq!(forming.composite_key(), "B-100-成型");

    let definitions = forming_definitions();

    // Catalog material: autofilled and locked.
    let mut material = MaterialForm::default();
    material.code = "M-01".to_string();
    material.apply_definition(definitions.material("M-01"));
    material.weight = "12.5".to_string();
    assert!(material.definition_locked());
    let payload = material.build_payload().unwrap();
    assert_eq!(payload.material_name, "树脂");
    assert_eq!(payload.unit.as_deref(), Some("kg"));

    // Equipment with a required widget: empty blocks, filled passes.
    let config = FieldConfig::default();
    let mut equipment = EquipmentForm::default();
    equipment.enter_create(&config);
    equipment.apply_definition(definitions.equipment("E-01"));
    equipment.start_time = "2025-03-01T08:00".to_string();
    assert!(equipment.build_submission(&config).is_err());
    equipment.set_parameter("temperature", "180");
    let submission = equipment.build_submission(&config).unwrap();
    assert_eq!(submission.payload["parameters"]["temperature"], "180");
    // Select default applied.
    assert_eq!(submission.payload["parameters"]["mode"], "自动");
    assert_eq!(submission.payload["status"], "正常运行");
}

#[test]
fn test_admin_cascading_delete_over_the_run() {
    let index = BatchIndex::from_batches(&run_batches());
    let chain = DeletionChain::build(index.views());

    // Both segments grouped under the shared number.
    assert_eq!(chain.products(), vec!["ProductX"]);
    assert_eq!(chain.batch_numbers("ProductX"), vec!["B-100"]);
    assert_eq!(chain.segments("ProductX", "B-100").len(), 2);

    let mut selection = Selection::default();
    selection.select_product(&chain, Some("ProductX"));
    selection.select_batch_number(&chain, Some("B-100"));
    selection.select_segment(&chain, Some("成型"));

    // Sole status auto-selected, quadruple complete.
    assert!(selection.ready());
    let key = selection.delete_key().unwrap();
    assert_eq!(key.process_segment, "成型");
    assert_eq!(key.status, "已完成");

    // The run moves on: forming row disappears after a refresh.
    let remaining: Vec<Batch> = serde_json::from_str(
        r#"[{
            "id": 1, "batch_number": "B-100", "product_name": "ProductX",
            "process_segment": "混合", "status": "进行中"
        }]"#,
    )
    .unwrap();
    let index = BatchIndex::from_batches(&remaining);
    let chain = DeletionChain::build(index.views());
    selection.revalidate(&chain);
    assert_eq!(selection.product.as_deref(), Some("ProductX"));
    assert!(selection.segment.is_none());
    assert!(!selection.ready());
}
