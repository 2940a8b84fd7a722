use todo_atoms::tasks::Task;

fn description_or_default(task: &Task) -> &str {
    task.description.as_deref().unwrap_or("No description")
}

fn due_date_or_default(task: &Task) -> String {
    task.due_date
        .map(|d| d.to_string())
        .unwrap_or_else(|| "No due date".to_string())
}

pub fn email_subject(task: &Task) -> String {
    format!("Task Reminder: {}", task.title)
}

pub fn email_html_body(task: &Task) -> String {
    format!(
        "<html><body>\
         <h2>Task Reminder</h2>\
         <p><strong>Title:</strong> {}</p>\
         <p><strong>Description:</strong> {}</p>\
         <p><strong>Priority:</strong> {}</p>\
         <p><strong>Due Date:</strong> {}</p>\
         <p>Don't forget to complete this task!</p>\
         </body></html>",
        task.title,
        description_or_default(task),
        task.priority,
        due_date_or_default(task)
    )
}

pub fn email_text_body(task: &Task) -> String {
    format!(
        "TASK REMINDER\n\n\
         Title: {}\n\
         Description: {}\n\
         Priority: {}\n\
         Due Date: {}\n\n\
         Don't forget to complete this task!",
        task.title,
        description_or_default(task),
        task.priority,
        due_date_or_default(task)
    )
}

pub fn sms_body(task: &Task) -> String {
    format!(
        "Task Reminder: {}\n\n{}\n\nDue: {} | Priority: {}",
        task.title,
        description_or_default(task),
        due_date_or_default(task),
        task.priority
    )
}
