/// Bus routing, memory regions and atomic aliases.
pub mod bus;

/// NVIC, SCB and SysTick register decoding.
pub mod ppb;

/// PWM slice counting, double buffering and edge modes.
pub mod pwm;
