pub mod efis_loop;
pub mod gnss_task;
