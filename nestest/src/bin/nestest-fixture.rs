//! Fixture suite exercising every execution path.
//!
//! The integration tests run it with `--test NAME` to pick one scenario.

use std::hint::black_box;
use std::process::ExitCode;
use std::time::Duration;

use nestest::{Suite, UnitOptions};

fn main() -> ExitCode {
    let suite = Suite::new();

    suite.test("math", |s| {
        let divisor = black_box(0u32);
        s.check_eq(2 + 2, 4);
        s.section_expect_fail("divide_by_zero", |_| {
            let _ = black_box(10 / divisor);
        });
    });

    suite.test("nested", |s| {
        let base = vec![1, 2, 3];
        s.check_eq(base.len(), 3);
        s.section("outer", |s| {
            s.check(base.contains(&2), "base keeps its elements");
            s.section("inner", |s| {
                s.check_eq(base.iter().sum::<i32>(), 6);
            });
            s.section("inner_sibling", |s| {
                s.check_eq(base[0], 1);
            });
        });
        s.section("second", |s| {
            s.check(!base.is_empty(), "base is not empty");
        });
    });

    suite.test("failing", |s| {
        s.check_eq("left", "right");
        s.section("still_runs", |s| {
            s.check_eq(1, 1);
        });
    });

    suite.test("unexpected_success", |s| {
        s.section_expect_fail("does_not_fail", |s| {
            s.check_eq(1 + 1, 2);
        });
    });

    suite.test("recorded_failure", |s| {
        s.section_expect_fail("records_only", |s| {
            s.fail("recorded without crashing");
        });
    });

    suite.test("aborts", |s| {
        s.section_expect_fail("process_abort", |s| {
            if s.is_isolated() {
                std::process::abort();
            }
        });
    });

    suite.test("exits_two", |s| {
        s.section_expect_fail("calls_exit", |_| {
            std::process::exit(2);
        });
    });

    suite.test_expect_fail("crashing_root", |s| {
        s.section("panics", |_| {
            panic!("fatal fault inside an expect-fail test");
        });
    });

    suite.test("hangs", |s| {
        s.section_expect_fail("sleeps", |_| {
            std::thread::sleep(Duration::from_secs(5));
            panic!("woke up");
        });
    });

    suite.test_with("narrow", UnitOptions::new().print_width(40).debug(true), |s| {
        s.debug(format!("{} forces debug mode", s.name()));
        s.section("child", |s| {
            s.debug(format!("child depth {}", s.depth()));
        });
        s.section_with("wide_child", UnitOptions::new().print_width(60), |_| {});
    });

    suite.main()
}
