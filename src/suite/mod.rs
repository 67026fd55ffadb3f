//! Bundled smoke suite
//!
//! Exercises the expectation vocabulary end to end. Every test passes.

use std::collections::HashMap;

use loupe::expectation::StreamMatcher;
use loupe::{Operator, Outcome, Test, TestCase, TestClass};
use regex::Regex;

pub fn register() {
    TestClass::builder::<ValuesTest>("ValuesTest")
        .test("test_truthiness", ValuesTest::test_truthiness)
        .test("test_equality", ValuesTest::test_equality)
        .test("test_collections", ValuesTest::test_collections)
        .test("test_options_and_types", ValuesTest::test_options_and_types)
        .test("test_numbers", ValuesTest::test_numbers)
        .register();

    TestClass::builder::<TextTest>("TextTest")
        .test("test_patterns", TextTest::test_patterns)
        .test("test_captured_output", TextTest::test_captured_output)
        .test("test_paths", TextTest::test_paths)
        .register();
}

#[derive(Default)]
struct ValuesTest {
    scores: HashMap<&'static str, u32>,
}

impl TestCase for ValuesTest {
    fn before(&mut self, _test: &mut Test) -> Outcome {
        self.scores.insert("ada", 36);
        self.scores.insert("grace", 85);
        Ok(())
    }
}

impl ValuesTest {
    fn test_truthiness(&mut self, t: &mut Test) -> Outcome {
        t.expect(true).to_be_truthy()?;
        t.expect(Some(3)).to_be_truthy()?;
        t.expect(None::<u8>).to_be_falsey()?;
        t.expect(Err::<(), _>("boom")).to_be_falsey()?;
        Ok(())
    }

    fn test_equality(&mut self, t: &mut Test) -> Outcome {
        t.expect(2 + 2).to_be_equal_to(4)?.to_not_be_equal_to(5)?;
        t.expect("loupe".to_string()).to_be_equal_to("loupe")?;
        Ok(())
    }

    fn test_collections(&mut self, t: &mut Test) -> Outcome {
        t.expect(&self.scores).to_include(&"ada")?.to_not_include(&"linus")?;
        t.expect(vec![1, 2, 3]).to_include(&2)?.to_not_be_empty()?;
        t.expect(Vec::<u8>::new()).to_be_empty()?;
        t.expect("magnifier").to_include("nifi")?.to_include(&'g')?;
        Ok(())
    }

    fn test_options_and_types(&mut self, t: &mut Test) -> Outcome {
        t.expect(self.scores.get("nobody")).to_be_nil()?;
        t.expect(self.scores.get("grace")).to_not_be_nil()?;
        t.expect(1.5_f64).to_be_an_instance_of::<f64>()?;
        t.expect("text").to_not_be_an_instance_of::<String>()?;

        let shared = &self.scores;
        t.expect(shared).to_be_the_same_as(&self.scores)?;
        Ok(())
    }

    fn test_numbers(&mut self, t: &mut Test) -> Outcome {
        t.expect(10).to_satisfy_operator(Operator::Gt, 3)?;
        t.expect(3).to_not_satisfy_operator(Operator::Ge, 10)?;
        t.expect(7).to_satisfy(|n| n % 7 == 0, "be a multiple of 7")?;
        t.expect(0.1_f64 + 0.2).to_be_in_delta_of(0.3, 1e-9)?;
        t.expect(1000.0_f64).to_be_in_epsilon_of(1001.0, 0.01)?;
        t.expect(1.0_f32).to_not_be_in_delta_of(2.0, 0.5)?;
        Ok(())
    }
}

#[derive(Default)]
struct TextTest;

impl TestCase for TextTest {}

impl TextTest {
    fn test_patterns(&mut self, t: &mut Test) -> Outcome {
        let version = Regex::new(r"^\d+\.\d+\.\d+$").expect("static pattern");
        t.expect(version).to_match("0.1.4")?.to_not_match("0.1")?;
        t.expect("a.c").to_match("a.c")?.to_not_match("abc")?;
        Ok(())
    }

    fn test_captured_output(&mut self, t: &mut Test) -> Outcome {
        let greeting = Regex::new("^hello").expect("static pattern");
        t.expect_output_to_match(Some(StreamMatcher::from(greeting)), None, |t| {
            t.puts("hello from the suite");
            Ok(())
        })?;
        t.expect_output_to_match(None, Some("warning\n".into()), |t| {
            t.eputs("warning");
            Ok(())
        })?;
        t.expect_output_to_be_empty(|_| Ok(()))?;
        t.expect_output_to_not_be_empty(|t| {
            t.puts("out");
            t.eputs("err");
            Ok(())
        })?;
        Ok(())
    }

    fn test_paths(&mut self, t: &mut Test) -> Outcome {
        t.expect(std::env::temp_dir()).to_be_an_existing_path()?;
        t.expect("/definitely/not/here").to_not_be_an_existing_path()?;
        Ok(())
    }
}
