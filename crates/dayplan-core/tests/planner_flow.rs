use chrono::{NaiveDate, NaiveDateTime};
use dayplan_core::lifegrid::{LifeGridError, LifeUnit, Lifespan};
use dayplan_core::planner::{DayPlanner, LayoutSettings, LifeSelection};
use dayplan_core::{build_life_grid, parse_clause, parse_schedule, peak_overlap, scroll_offset};

fn day0() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 10).expect("valid date")
}

fn at(date: NaiveDate, hour: u32, minute: u32) -> NaiveDateTime {
    date.and_hms_opt(hour, minute, 0).expect("valid time")
}

#[test]
fn party_clause_wraps_into_next_day() {
    let event = parse_clause("Party 11:00-1:00 am", day0()).expect("parse clause");
    let next = day0().succ_opt().expect("next day");
    assert_eq!(event.start, at(day0(), 11, 0));
    assert_eq!(event.end, at(next, 1, 0));
}

#[test]
fn blank_schedules_produce_nothing() {
    for input in ["", "   ", " ; ; "] {
        let result = parse_schedule(input, day0());
        assert!(result.events.is_empty());
        assert!(result.errors.is_empty());
    }
}

#[test]
fn abutting_events_peak_at_two() {
    let result = parse_schedule("A 9:00-10:00 am; B 10:00-11:00 am", day0());
    assert_eq!(result.events.len(), 2);
    assert_eq!(peak_overlap(&result.events), 2);
}

#[test]
fn life_grid_matches_documented_example() {
    let now = at(NaiveDate::from_ymd_opt(2020, 1, 1).expect("valid date"), 0, 0);
    let grid = build_life_grid("2000-01-01", Some(Lifespan::Healthy), LifeUnit::Week, now)
        .expect("build grid");
    assert_eq!(grid.total_units, 80 * 52);
    assert_eq!(grid.elapsed_units, 1043);
    assert_eq!((grid.rows, grid.columns), (80, 52));
    assert!(grid.cells[0].elapsed);
    assert!(!grid.cells[4159].elapsed);

    let err = build_life_grid("2020-01-01", Some(Lifespan::Healthy), LifeUnit::Week, now)
        .expect_err("birthdate equal to now");
    assert!(matches!(err, LifeGridError::InvalidBirthdate { .. }));
}

#[test]
fn every_component_is_repeatable() {
    let input = "Standup 9:00-9:15 am; [Lunch] 12:00-1:00 pm; ???";
    assert_eq!(parse_schedule(input, day0()), parse_schedule(input, day0()));

    let events = parse_schedule(input, day0()).events;
    assert_eq!(peak_overlap(&events), peak_overlap(&events));

    let now = at(day0(), 15, 45);
    assert_eq!(
        scroll_offset(now, 4850.0, 600.0).to_bits(),
        scroll_offset(now, 4850.0, 600.0).to_bits()
    );
}

#[test]
fn planner_session_end_to_end() {
    let mut planner = DayPlanner::new(LayoutSettings::default());
    let errors = planner.commit("Standup 9:00-9:15 am; [Lunch] 12:00-1:00 pm; later maybe", day0());
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].raw_clause, "later maybe");

    planner.repeat_tomorrow(day0());
    assert_eq!(planner.events().len(), 4);

    planner.set_life(LifeSelection {
        birthdate: "1990-06-15".to_string(),
        lifespan: Some(Lifespan::Unhealthy),
        unit: LifeUnit::Day,
    });
    planner.set_locked_to_now(true);

    let frame = planner.refresh(at(day0(), 12, 30));
    assert_eq!(frame.current_events().collect::<Vec<_>>(), vec![1]);
    assert!(frame.scroll_offset.is_some());
    let grid = frame.life.expect("life grid");
    assert_eq!(grid.columns, 7);
    assert!(!grid.is_exceeded());
}
