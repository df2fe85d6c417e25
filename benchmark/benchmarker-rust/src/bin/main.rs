use benchmarker::measure_memory::MeasureMemory;
use benchmarker::measure_time::measure_time;
use benchmarker::subject::Subject;
use hashbrown::HashMap as HashbrownMap;
use lightmap::LightMap;
use std::collections::HashMap as StdMap;
use std::error::Error;

#[global_allocator]
static MEASURE_MEMORY: MeasureMemory = MeasureMemory::new();

struct Workload {
    keys: Vec<String>,
    values: Vec<String>,
}

impl Workload {
    fn new(count: usize) -> Self {
        Self {
            keys: (0..count).map(|i| i.to_string()).collect(),
            values: (0..count).map(|i| format!("value{i}")).collect(),
        }
    }
}

fn solver<S: Subject>(args: &Args, workload: &Workload) -> Result<(), Box<dyn Error>> {
    let before = MEASURE_MEMORY.measure();
    let mut subject = S::new(args.key_capacity, args.value_capacity)?;
    let mut rejected = 0usize;
    let time_put = measure_time(|| {
        for (key, value) in workload.keys.iter().zip(workload.values.iter()) {
            if !subject.build(key, value) {
                rejected += 1;
            }
        }
    });
    let memory = MEASURE_MEMORY.measure().saturating_sub(before);
    let mut found = 0usize;
    let time_get = measure_time(|| {
        found = workload
            .keys
            .iter()
            .filter(|key| subject.probe(key).is_some())
            .count();
    });
    println!(
        "{},{time_put},{time_get},{memory},{},{found},{rejected}",
        S::NAME,
        subject.len()
    );
    subject.report();
    Ok(())
}

#[derive(clap::Parser, Debug)]
#[clap(version, about)]
struct Args {
    /// Number of entries to insert
    #[clap(short, long, value_parser, default_value_t = 1000)]
    count: usize,

    #[clap(long, value_parser, default_value_t = 8)]
    key_capacity: usize,

    #[clap(long, value_parser, default_value_t = 13)]
    value_capacity: usize,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args = <Args as clap::Parser>::parse();
    let workload = Workload::new(args.count);
    println!("subject,time_put,time_get,memory,len,found,rejected");
    solver::<LightMap>(&args, &workload)?;
    solver::<HashbrownMap<Box<[u8]>, Box<[u8]>>>(&args, &workload)?;
    solver::<StdMap<String, String>>(&args, &workload)?;
    Ok(())
}
