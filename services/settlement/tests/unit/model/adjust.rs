use std::str::FromStr;

use rust_decimal::Decimal;

use carshare_common::api::dto::CurrencyDto;

use settlement::api::web::dto::{AdjustLineReqDto, ChargeLineLabelDto};
use settlement::model::{AdjustmentRecordModel, ResolutionModelError, WaiveRecordModel};

use super::ut_setup_breakdown_direct;

#[rustfmt::skip]
fn ut_try_waive(original: &str, pct: u16) -> Result<WaiveRecordModel, ResolutionModelError> {
    let arg = (
        551u32,
        Decimal::from_str(original).unwrap(),
        CurrencyDto::USD,
        pct,
        "goodwill for returning customer".to_string(),
        9920u32,
    );
    WaiveRecordModel::try_from(arg)
}

#[test]
fn waive_parts_reassemble_exactly() {
    // rounding-safe complement, waived + remaining always equals the
    // original amount regardless of the percentage
    let cases: [(&str, u16); 6] = [
        ("480.00", 0),
        ("480.00", 25),
        ("480.00", 100),
        ("100.01", 33),
        ("0.01", 50),
        ("0", 75),
    ];
    for (original, pct) in cases {
        let rec = ut_try_waive(original, pct).unwrap();
        let reassembled = rec.waived_amount() + rec.remaining_amount();
        assert_eq!(reassembled, Decimal::from_str(original).unwrap());
        assert_eq!(rec.percentage(), pct as u8);
    }
}

#[test]
fn waive_half_rounded_to_currency_scale() {
    let rec = ut_try_waive("100.01", 33).unwrap();
    assert_eq!(rec.waived_amount(), Decimal::from_str("33.00").unwrap());
    assert_eq!(rec.remaining_amount(), Decimal::from_str("67.01").unwrap());
    let rec = ut_try_waive("250.50", 50).unwrap();
    assert_eq!(rec.waived_amount(), Decimal::from_str("125.25").unwrap());
    assert!(!rec.full_waive());
    let rec = ut_try_waive("250.50", 100).unwrap();
    assert!(rec.full_waive());
    assert_eq!(rec.remaining_amount(), Decimal::ZERO);
}

#[test]
fn waive_percent_out_of_range_rejected() {
    for pct in [101u16, 250u16, u16::MAX] {
        let result = ut_try_waive("480.00", pct);
        if let Err(ResolutionModelError::PercentOutOfRange(given)) = result {
            assert_eq!(given, pct);
        } else {
            assert!(false);
        }
    }
}

#[test]
fn waive_empty_reason_rejected() {
    let arg = (
        551u32,
        Decimal::new(48000, 2),
        CurrencyDto::USD,
        40u16,
        "  ".to_string(),
        9920u32,
    );
    let result = WaiveRecordModel::try_from(arg);
    assert!(matches!(result, Err(ResolutionModelError::EmptyReason)));
}

#[rustfmt::skip]
fn ut_adjust_lines() -> Vec<AdjustLineReqDto> {
    vec![
        AdjustLineReqDto {
            line: ChargeLineLabelDto::Mileage,
            adjusted_amount: "60.00".to_string(),
            included: true,
        },
        AdjustLineReqDto {
            line: ChargeLineLabelDto::Fuel,
            adjusted_amount: "225".to_string(),
            included: false,
        },
        AdjustLineReqDto {
            line: ChargeLineLabelDto::Late,
            adjusted_amount: "100.00".to_string(),
            included: true,
        },
        AdjustLineReqDto {
            line: ChargeLineLabelDto::Damage,
            adjusted_amount: "0".to_string(),
            included: false,
        },
    ]
}

#[test]
fn adjustment_totals() {
    // original lines, mileage 90, fuel 225, late 250, damage 430.50
    let breakdown = ut_setup_breakdown_direct((9000, 2), (22500, 2), (25000, 2), (43050, 2));
    let arg = (
        702u32,
        &breakdown,
        ut_adjust_lines(),
        "disputed damage, goodwill on late fee".to_string(),
        8814u32,
    );
    let rec = AdjustmentRecordModel::try_from(arg).unwrap();
    assert_eq!(rec.original_total(), Decimal::from_str("995.50").unwrap());
    assert_eq!(rec.adjusted_total(), Decimal::from_str("160.00").unwrap());
    assert_eq!(rec.total_adjustment(), Decimal::from_str("835.50").unwrap());
}

#[test]
fn adjustment_all_excluded_total_zero() {
    let breakdown = ut_setup_breakdown_direct((9000, 2), (0, 2), (0, 2), (0, 2));
    let lines = vec![AdjustLineReqDto {
        line: ChargeLineLabelDto::Mileage,
        adjusted_amount: "90.00".to_string(),
        included: false,
    }];
    let arg = (703u32, &breakdown, lines, "charge dropped".to_string(), 8814u32);
    let rec = AdjustmentRecordModel::try_from(arg).unwrap();
    assert_eq!(rec.adjusted_total(), Decimal::ZERO);
}

#[test]
fn adjustment_rejects_exceeding_original() {
    let breakdown = ut_setup_breakdown_direct((9000, 2), (22500, 2), (25000, 2), (0, 2));
    let lines = vec![AdjustLineReqDto {
        line: ChargeLineLabelDto::Mileage,
        adjusted_amount: "90.01".to_string(),
        included: true,
    }];
    let arg = (704u32, &breakdown, lines, "typo".to_string(), 8814u32);
    let result = AdjustmentRecordModel::try_from(arg);
    if let Err(mut es) = result {
        assert_eq!(es.len(), 1);
        let e = es.remove(0);
        assert!(matches!(e, ResolutionModelError::ExceedsOriginal { .. }));
    } else {
        assert!(false);
    }
}

#[test]
fn adjustment_rejects_duplicate_and_empty() {
    let breakdown = ut_setup_breakdown_direct((9000, 2), (22500, 2), (25000, 2), (0, 2));
    let lines = vec![
        AdjustLineReqDto {
            line: ChargeLineLabelDto::Fuel,
            adjusted_amount: "10".to_string(),
            included: true,
        },
        AdjustLineReqDto {
            line: ChargeLineLabelDto::Fuel,
            adjusted_amount: "20".to_string(),
            included: true,
        },
    ];
    let arg = (705u32, &breakdown, lines, "dup".to_string(), 8814u32);
    let result = AdjustmentRecordModel::try_from(arg);
    if let Err(mut es) = result {
        assert_eq!(es.len(), 1);
        assert!(matches!(es.remove(0), ResolutionModelError::DuplicateLine(_)));
    } else {
        assert!(false);
    }
    let arg = (706u32, &breakdown, Vec::new(), "nothing".to_string(), 8814u32);
    let result = AdjustmentRecordModel::try_from(arg);
    if let Err(mut es) = result {
        assert!(matches!(es.remove(0), ResolutionModelError::EmptyResolution));
    } else {
        assert!(false);
    }
}
