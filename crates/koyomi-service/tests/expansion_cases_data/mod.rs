pub struct ExpansionCase {
    pub name: &'static str,
    pub events: &'static str,
    pub from: &'static str,
    pub to: &'static str,
    pub expected: &'static [(&'static str, &'static str, &'static str)],
}

#[expect(clippy::too_many_lines)]
pub fn expansion_cases() -> Vec<ExpansionCase> {
    vec![
        ExpansionCase {
            name: "singleton_inside_window",
            events: "BEGIN:VEVENT\nUID:lunch\nDTSTART:20240108T120000Z\nDTEND:20240108T130000Z\nSUMMARY:Lunch\nEND:VEVENT\n",
            from: "2024-01-08T00:00:00Z",
            to: "2024-01-08T23:59:59Z",
            expected: &[("lunch", "", "Lunch")],
        },
        ExpansionCase {
            name: "singleton_touching_window_start",
            events: "BEGIN:VEVENT\nUID:lunch\nDTSTART:20240108T120000Z\nDTEND:20240108T130000Z\nSUMMARY:Lunch\nEND:VEVENT\n",
            from: "2024-01-08T13:00:00Z",
            to: "2024-01-08T23:59:59Z",
            expected: &[("lunch", "", "Lunch")],
        },
        ExpansionCase {
            name: "singleton_before_window",
            events: "BEGIN:VEVENT\nUID:lunch\nDTSTART:20240108T120000Z\nDTEND:20240108T130000Z\nSUMMARY:Lunch\nEND:VEVENT\n",
            from: "2024-01-08T13:00:01Z",
            to: "2024-01-08T23:59:59Z",
            expected: &[],
        },
        ExpansionCase {
            name: "all_day_single_day",
            events: "BEGIN:VEVENT\nUID:holiday\nDTSTART;VALUE=DATE:20240108\nDTEND;VALUE=DATE:20240109\nSUMMARY:Holiday\nEND:VEVENT\n",
            from: "2024-01-08T00:00:00Z",
            to: "2024-01-08T23:59:59Z",
            expected: &[("holiday", "", "Holiday")],
        },
        ExpansionCase {
            name: "all_day_excluded_next_day",
            events: "BEGIN:VEVENT\nUID:holiday\nDTSTART;VALUE=DATE:20240108\nDTEND;VALUE=DATE:20240109\nSUMMARY:Holiday\nEND:VEVENT\n",
            from: "2024-01-09T00:00:00Z",
            to: "2024-01-09T23:59:59Z",
            expected: &[],
        },
        ExpansionCase {
            name: "weekly_all_day_with_count",
            events: "BEGIN:VEVENT\nUID:bins\nDTSTART;VALUE=DATE:20240101\nRRULE:FREQ=WEEKLY;COUNT=3\nSUMMARY:Bins\nEND:VEVENT\n",
            from: "2024-01-01T00:00:00Z",
            to: "2024-12-31T23:59:59Z",
            expected: &[
                ("bins", "2024-01-01", "Bins"),
                ("bins", "2024-01-08", "Bins"),
                ("bins", "2024-01-15", "Bins"),
            ],
        },
        ExpansionCase {
            name: "daily_with_exdate_list",
            events: "BEGIN:VEVENT\nUID:gym\nDTSTART:20240101T070000Z\nDTEND:20240101T080000Z\nRRULE:FREQ=DAILY;COUNT=5\nEXDATE:20240102T070000Z,20240104T070000Z\nSUMMARY:Gym\nEND:VEVENT\n",
            from: "2024-01-01T00:00:00Z",
            to: "2024-01-31T00:00:00Z",
            expected: &[
                ("gym", "2024-01-01T07:00:00Z", "Gym"),
                ("gym", "2024-01-03T07:00:00Z", "Gym"),
                ("gym", "2024-01-05T07:00:00Z", "Gym"),
            ],
        },
        ExpansionCase {
            name: "exdate_with_other_granularity_is_ignored",
            events: "BEGIN:VEVENT\nUID:gym\nDTSTART:20240101T000000Z\nRRULE:FREQ=DAILY;COUNT=2\nEXDATE;VALUE=DATE:20240102\nSUMMARY:Gym\nEND:VEVENT\n",
            from: "2024-01-01T00:00:00Z",
            to: "2024-01-31T00:00:00Z",
            expected: &[
                ("gym", "2024-01-01T00:00:00Z", "Gym"),
                ("gym", "2024-01-02T00:00:00Z", "Gym"),
            ],
        },
        ExpansionCase {
            name: "exception_with_later_sequence",
            events: "BEGIN:VEVENT\nUID:sync\nDTSTART:20240101T100000Z\nRRULE:FREQ=WEEKLY;COUNT=2\nSUMMARY:Sync\nEND:VEVENT\nBEGIN:VEVENT\nUID:sync\nRECURRENCE-ID:20240108T100000Z\nSEQUENCE:1\nDTSTART:20240108T110000Z\nSUMMARY:Sync (moved)\nEND:VEVENT\nBEGIN:VEVENT\nUID:sync\nRECURRENCE-ID:20240108T100000Z\nSEQUENCE:2\nDTSTART:20240108T150000Z\nSUMMARY:Sync (moved again)\nEND:VEVENT\n",
            from: "2024-01-01T00:00:00Z",
            to: "2024-01-31T00:00:00Z",
            expected: &[
                ("sync", "2024-01-01T10:00:00Z", "Sync"),
                ("sync", "2024-01-08T10:00:00Z", "Sync (moved again)"),
            ],
        },
        ExpansionCase {
            name: "orphan_exception",
            events: "BEGIN:VEVENT\nUID:elsewhere\nRECURRENCE-ID:20240108T100000Z\nDTSTART:20240108T100000Z\nSUMMARY:Detached\nEND:VEVENT\n",
            from: "2024-01-01T00:00:00Z",
            to: "2024-01-31T00:00:00Z",
            expected: &[("elsewhere", "2024-01-08T10:00:00Z", "Detached")],
        },
        ExpansionCase {
            name: "zoned_weekly_across_dst",
            events: "BEGIN:VEVENT\nUID:ny\nDTSTART;TZID=America/New_York:20240304T090000\nRRULE:FREQ=WEEKLY;COUNT=2\nSUMMARY:Standup\nEND:VEVENT\n",
            from: "2024-03-01T00:00:00Z",
            to: "2024-03-31T00:00:00Z",
            expected: &[
                ("ny", "2024-03-04T14:00:00Z", "Standup"),
                ("ny", "2024-03-11T13:00:00Z", "Standup"),
            ],
        },
        ExpansionCase {
            name: "weekly_all_day_with_date_until",
            events: "BEGIN:VEVENT\nUID:bins\nDTSTART;VALUE=DATE:20240101\nRRULE:FREQ=WEEKLY;UNTIL=20240115\nSUMMARY:Bins\nEND:VEVENT\n",
            from: "2024-01-01T00:00:00Z",
            to: "2024-12-31T23:59:59Z",
            expected: &[
                ("bins", "2024-01-01", "Bins"),
                ("bins", "2024-01-08", "Bins"),
                ("bins", "2024-01-15", "Bins"),
            ],
        },
        ExpansionCase {
            name: "floating_weekly_with_floating_until",
            events: "BEGIN:VEVENT\nUID:class\nDTSTART:20240101T090000\nRRULE:FREQ=WEEKLY;UNTIL=20240115T090000\nSUMMARY:Class\nEND:VEVENT\n",
            from: "2024-01-01T00:00:00Z",
            to: "2024-12-31T23:59:59Z",
            expected: &[
                ("class", "2024-01-01T09:00:00Z", "Class"),
                ("class", "2024-01-08T09:00:00Z", "Class"),
                ("class", "2024-01-15T09:00:00Z", "Class"),
            ],
        },
        ExpansionCase {
            name: "zoned_weekly_with_date_until",
            events: "BEGIN:VEVENT\nUID:berlin\nDTSTART;TZID=Europe/Berlin:20240101T090000\nRRULE:FREQ=WEEKLY;UNTIL=20240115\nSUMMARY:Jour fixe\nEND:VEVENT\n",
            from: "2024-01-01T00:00:00Z",
            to: "2024-12-31T23:59:59Z",
            expected: &[
                ("berlin", "2024-01-01T08:00:00Z", "Jour fixe"),
                ("berlin", "2024-01-08T08:00:00Z", "Jour fixe"),
                ("berlin", "2024-01-15T08:00:00Z", "Jour fixe"),
            ],
        },
        ExpansionCase {
            name: "windows_tzid_across_dst",
            events: "BEGIN:VEVENT\nUID:outlook\nDTSTART;TZID=Eastern Standard Time:20240304T090000\nRRULE:FREQ=WEEKLY;COUNT=2\nSUMMARY:Standup\nEND:VEVENT\n",
            from: "2024-03-01T00:00:00Z",
            to: "2024-03-31T00:00:00Z",
            expected: &[
                ("outlook", "2024-03-04T14:00:00Z", "Standup"),
                ("outlook", "2024-03-11T13:00:00Z", "Standup"),
            ],
        },
        ExpansionCase {
            name: "feed_defined_timezone",
            events: "BEGIN:VTIMEZONE\nTZID:Campus Time\nBEGIN:STANDARD\nDTSTART:19700101T000000\nTZOFFSETFROM:+0530\nTZOFFSETTO:+0530\nEND:STANDARD\nEND:VTIMEZONE\nBEGIN:VEVENT\nUID:campus\nDTSTART;TZID=Campus Time:20240108T090000\nRRULE:FREQ=DAILY;COUNT=2\nSUMMARY:Lecture\nEND:VEVENT\n",
            from: "2024-01-01T00:00:00Z",
            to: "2024-01-31T00:00:00Z",
            expected: &[
                ("campus", "2024-01-08T03:30:00Z", "Lecture"),
                ("campus", "2024-01-09T03:30:00Z", "Lecture"),
            ],
        },
    ]
}
