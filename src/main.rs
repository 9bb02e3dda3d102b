mod config;

use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;

use config::DemoConfig;

use scalargrad::{Graph, Mlp, Module};

fn main() -> Result<(), scalargrad::Error> {
    env_logger::init();

    let cfg = DemoConfig::from_env()?;
    info!("demo config: {:?}", cfg);

    let mut g = Graph::new();
    let mut rng = StdRng::seed_from_u64(cfg.seed);
    let mlp = Mlp::new(&mut g, cfg.inputs, &cfg.layers, &cfg.weight_init(), &mut rng)?;
    println!("{}", mlp);

    let x: Vec<_> = (0..cfg.inputs)
        .map(|i| {
            let sign = if i % 2 == 0 { 1.0 } else { -1.0 };
            g.leaf(sign * (i + 1) as f64)
        })
        .collect();
    let outputs = mlp.forward(&mut g, &x)?;
    let total = g.sum(outputs.iter().copied());

    mlp.zero_grad(&mut g);
    g.backward(total);

    ptree::print_tree(&g.view(total))?;

    for (i, p) in mlp.parameters().into_iter().enumerate() {
        debug!("param {} {}", i, g.view(p));
    }
    for (i, xi) in x.iter().enumerate() {
        println!("d out / d x{} = {}", i, g.grad(*xi));
    }

    Ok(())
}
