use arrow::array::{
    Array, ArrayRef, Date32Array, Float64Array, Int64Array, StringArray, StringBuilder,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use adu_pipeline::pipeline::unify::concat_common_columns;
use adu_pipeline::schema::adapt::{
    AdaptationStrategy, DateFormatConfig, TypeCompatibility, adapt_record_batch,
    check_schema_with_adaptation, check_type_compatibility, convert_array, date_to_days,
};
use chrono::NaiveDate;
use std::sync::Arc;

#[test]
fn test_type_compatibility() {
    // Exact compatibility
    assert_eq!(
        check_type_compatibility(&DataType::Int64, &DataType::Int64),
        TypeCompatibility::Exact
    );

    // Numeric widening
    assert_eq!(
        check_type_compatibility(&DataType::Int32, &DataType::Int64),
        TypeCompatibility::Compatible
    );
    assert_eq!(
        check_type_compatibility(&DataType::Int64, &DataType::Float64),
        TypeCompatibility::Compatible
    );

    // Permit dates arrive as text
    assert_eq!(
        check_type_compatibility(&DataType::Utf8, &DataType::Date32),
        TypeCompatibility::Compatible
    );

    assert_eq!(
        check_type_compatibility(&DataType::Utf8, &DataType::Binary),
        TypeCompatibility::Incompatible
    );
}

#[test]
fn test_schema_compatibility_report() {
    let source_schema = Schema::new(vec![
        Field::new("permit_value", DataType::Int32, true),
        Field::new("neighborhood", DataType::Utf8, true),
        Field::new("issued_date", DataType::Utf8, true),
    ]);
    let target_schema = Schema::new(vec![
        Field::new("permit_value", DataType::Int64, true),
        Field::new("neighborhood", DataType::Utf8, true),
        Field::new("issued_date", DataType::Date32, true),
    ]);

    let report = check_schema_with_adaptation(&source_schema, &target_schema);
    assert!(report.compatible);
    assert_eq!(report.adaptations.len(), 2);

    let value = report
        .adaptations
        .iter()
        .find(|a| a.field_name == "permit_value")
        .expect("Should have adaptation for permit_value");
    assert_eq!(value.adaptation_strategy, AdaptationStrategy::NumericConversion);

    let issued = report
        .adaptations
        .iter()
        .find(|a| a.field_name == "issued_date")
        .expect("Should have adaptation for issued_date");
    assert_eq!(issued.adaptation_strategy, AdaptationStrategy::DateParsing);
}

#[test]
fn test_permit_date_strings_to_date32() {
    let mut builder = StringBuilder::new();
    builder.append_value("01/10/2023 10:00:00 AM");
    builder.append_value("01/20/2023");
    builder.append_value("2023-02-05");
    builder.append_value("not a date");
    builder.append_null();
    let strings: ArrayRef = Arc::new(builder.finish());

    let result = convert_array(&strings, &DataType::Date32, &DateFormatConfig::default()).unwrap();
    let dates = result
        .as_any()
        .downcast_ref::<Date32Array>()
        .expect("Should convert to Date32Array");

    let day = |y, m, d| date_to_days(NaiveDate::from_ymd_opt(y, m, d).unwrap());
    assert_eq!(dates.value(0), day(2023, 1, 10));
    assert_eq!(dates.value(1), day(2023, 1, 20));
    assert_eq!(dates.value(2), day(2023, 2, 5));
    assert!(dates.is_null(3));
    assert!(dates.is_null(4));
}

#[test]
fn test_numeric_conversion() {
    let values = vec![10, 20, 30];
    let ints: ArrayRef = Arc::new(Int64Array::from(values.clone()));
    let result = convert_array(&ints, &DataType::Float64, &DateFormatConfig::default()).unwrap();
    let floats = result
        .as_any()
        .downcast_ref::<Float64Array>()
        .expect("Should convert to Float64Array");
    for (i, val) in values.iter().enumerate() {
        assert_eq!(floats.value(i), *val as f64);
    }
}

#[test]
fn test_adapt_record_batch_fills_missing_columns() {
    let source = RecordBatch::try_from_iter(vec![
        ("permit_value", Arc::new(Int64Array::from(vec![85_000, 60_000])) as ArrayRef),
        (
            "issued_date",
            Arc::new(StringArray::from(vec!["01/20/2023", "02/20/2023"])) as ArrayRef,
        ),
    ])
    .unwrap();
    let target = Schema::new(vec![
        Field::new("permit_value", DataType::Float64, true),
        Field::new("issued_date", DataType::Date32, true),
        Field::new("neighborhood", DataType::Utf8, true),
    ]);

    let adapted = adapt_record_batch(&source, &target, &DateFormatConfig::default()).unwrap();
    assert_eq!(adapted.num_rows(), 2);
    assert_eq!(adapted.schema().field(1).data_type(), &DataType::Date32);
    assert_eq!(adapted.column(2).null_count(), 2);
}

#[test]
fn test_concat_widens_disagreeing_columns() {
    let attached = RecordBatch::try_from_iter(vec![
        ("permit_value", Arc::new(Int64Array::from(vec![85_000])) as ArrayRef),
        ("only_attached", Arc::new(Int64Array::from(vec![1])) as ArrayRef),
    ])
    .unwrap();
    let detached = RecordBatch::try_from_iter(vec![
        ("permit_value", Arc::new(Float64Array::from(vec![190_000.5])) as ArrayRef),
    ])
    .unwrap();

    let unified = concat_common_columns(&attached, &detached, &DateFormatConfig::default()).unwrap();
    assert_eq!(unified.num_rows(), 2);
    assert_eq!(unified.num_columns(), 1);
    assert_eq!(unified.schema().field(0).data_type(), &DataType::Float64);
}
